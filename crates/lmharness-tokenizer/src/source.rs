use std::fmt;
use std::path::{Path, PathBuf};

use hf_hub::api::sync::{Api, ApiRepo};
use hf_hub::{Repo, RepoType};
use lmharness_abi::{Error, Result};
use tracing::{debug, info};

enum Location {
    Local(PathBuf),
    Hub {
        id: String,
        revision: String,
        repo: ApiRepo,
    },
}

/// Where a model's files come from: a directory on disk or a Hub repository
/// pinned to one revision. `subfolder` is prefixed to every requested file.
pub struct ModelSource {
    location: Location,
    subfolder: Option<String>,
}

impl ModelSource {
    /// Local directory if `pretrained` exists on disk, otherwise a Hub repo id.
    pub fn open(pretrained: &str, revision: &str, subfolder: Option<&str>) -> Result<Self> {
        let subfolder = subfolder
            .map(|s| s.trim_matches('/').to_string())
            .filter(|s| !s.is_empty());

        let path = Path::new(pretrained);
        if path.is_dir() {
            info!(path = %path.display(), "using local model directory");
            return Ok(Self {
                location: Location::Local(path.to_path_buf()),
                subfolder,
            });
        }
        if pretrained.trim().is_empty() {
            return Err(Error::load("empty model source"));
        }

        let api = Api::new().map_err(|e| Error::load(format!("hub client: {e}")))?;
        let repo = api.repo(Repo::with_revision(
            pretrained.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));
        info!(repo = pretrained, revision, "using hub model repository");
        Ok(Self {
            location: Location::Hub {
                id: pretrained.to_string(),
                revision: revision.to_string(),
                repo,
            },
            subfolder,
        })
    }

    /// A local directory, without touching the network.
    pub fn local(root: impl Into<PathBuf>, subfolder: Option<&str>) -> Self {
        Self {
            location: Location::Local(root.into()),
            subfolder: subfolder
                .map(|s| s.trim_matches('/').to_string())
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.location, Location::Local(_))
    }

    /// Name of `file` inside the repository, with the subfolder applied.
    pub fn repo_path(&self, file: &str) -> String {
        match &self.subfolder {
            Some(dir) => format!("{dir}/{file}"),
            None => file.to_string(),
        }
    }

    /// Resolve `file` to a path on disk, downloading it if needed.
    pub fn get(&self, file: &str) -> Result<PathBuf> {
        let name = self.repo_path(file);
        match &self.location {
            Location::Local(root) => {
                let path = root.join(&name);
                if path.is_file() {
                    Ok(path)
                } else {
                    Err(Error::load(format!("{} not found", path.display())))
                }
            }
            Location::Hub { repo, .. } => {
                debug!(file = %name, source = %self, "fetching");
                repo.get(&name)
                    .map_err(|e| Error::load(format!("{self}: cannot fetch {name}: {e}")))
            }
        }
    }

    /// Like [`get`](Self::get) but a missing file is `None`.
    pub fn try_get(&self, file: &str) -> Option<PathBuf> {
        self.get(file).ok()
    }
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Location::Local(root) => write!(f, "{}", root.display())?,
            Location::Hub { id, revision, .. } => write!(f, "{id}@{revision}")?,
        }
        if let Some(dir) = &self.subfolder {
            write!(f, " ({dir})")?;
        }
        Ok(())
    }
}
