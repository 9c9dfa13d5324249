use ha_bind::DeviceBuilder;

/// Version and package information extracted from Cargo.toml at compile time
pub struct VersionInfo {
    pub version: String,
    pub name: String,
    pub repository: String,
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            name: env!("CARGO_PKG_NAME").to_string(),
            repository: env!("CARGO_PKG_REPOSITORY").to_string(),
        }
    }
}

impl VersionInfo {
    /// Get a static instance of version information
    pub fn get() -> &'static VersionInfo {
        static VERSION_INFO: std::sync::OnceLock<VersionInfo> = std::sync::OnceLock::new();
        VERSION_INFO.get_or_init(VersionInfo::default)
    }

    /// Adds the software descriptors (`sw`, `cu`) to a device's metadata and
    /// fills in `mf`/`mdl` when the config leaves them out.
    pub fn describe(
        &self,
        builder: DeviceBuilder,
        manufacturer: Option<&str>,
        model: Option<&str>,
    ) -> DeviceBuilder {
        builder
            .metadata("mf", manufacturer.unwrap_or("Custom"))
            .metadata("mdl", model.unwrap_or(self.name.as_str()))
            .metadata("sw", self.version.as_str())
            .metadata("cu", self.repository.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ha_bind::Device;
    use serde_json::json;

    #[test]
    fn describe_uses_package_defaults() {
        let info = VersionInfo::get();
        let device = info.describe(Device::builder("Host"), None, None).build();
        assert_eq!(device.metadata()["mf"], json!("Custom"));
        assert_eq!(device.metadata()["mdl"], json!(env!("CARGO_PKG_NAME")));
        assert_eq!(device.metadata()["sw"], json!(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn describe_prefers_configured_values() {
        let device = VersionInfo::get()
            .describe(Device::builder("Host"), Some("Raspberry Pi"), Some("4B"))
            .build();
        assert_eq!(device.metadata()["mf"], json!("Raspberry Pi"));
        assert_eq!(device.metadata()["mdl"], json!("4B"));
    }
}
