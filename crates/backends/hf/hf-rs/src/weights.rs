use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::PathBuf;

use lmharness_abi::{Error, Result};
use lmharness_tokenizer::ModelSource;
use serde::Deserialize;

const SINGLE_FILE: &str = "model.safetensors";
const SHARD_INDEX: &str = "model.safetensors.index.json";

#[derive(Deserialize)]
struct ShardIndex {
    weight_map: HashMap<String, String>,
}

/// Safetensors files making up the checkpoint: the shards listed in
/// `model.safetensors.index.json` when present, else `model.safetensors`.
pub fn safetensors_files(source: &ModelSource) -> Result<Vec<PathBuf>> {
    let Some(index) = source.try_get(SHARD_INDEX) else {
        return Ok(vec![source.get(SINGLE_FILE)?]);
    };
    let raw = fs::read_to_string(&index)
        .map_err(|e| Error::load(format!("{}: {e}", index.display())))?;
    shard_names(&raw)?
        .iter()
        .map(|name| source.get(name))
        .collect()
}

/// Distinct shard file names in an index, sorted.
pub fn shard_names(index_json: &str) -> Result<Vec<String>> {
    let index: ShardIndex = serde_json::from_str(index_json)
        .map_err(|e| Error::load(format!("{SHARD_INDEX}: {e}")))?;
    let names: BTreeSet<String> = index.weight_map.into_values().collect();
    if names.is_empty() {
        return Err(Error::load(format!("{SHARD_INDEX} lists no shards")));
    }
    Ok(names.into_iter().collect())
}
