/// Number of Metal devices the system exposes.
pub fn device_count() -> usize {
    if metal::Device::system_default().is_none() {
        return 0;
    }
    metal::Device::all().len()
}
