//! Integration tests for config

#[cfg(test)]
mod tests {
    use ebs_config::*;
    use ebs_types::OutputFormat;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Mutex to ensure env var tests don't run concurrently
    static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 5] = [
        "EBS_OUTPUT",
        "EBS_RPATH",
        "EBS_PARALLEL",
        "EBS_INSTALL_PATH",
        "EBS_BUILD_PATH",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[tokio::test]
    async fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[general]
default_output = "plain"

[build]
rpath = true
parallel = 4

[paths]
install_path = "/apps/software"
build_path = "/scratch/build"
        "#
        )
        .unwrap();

        let config = Config::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.general.default_output, OutputFormat::Plain);
        assert!(config.build.rpath);
        assert_eq!(config.build.parallel, 4);
        assert_eq!(config.install_path(), PathBuf::from("/apps/software"));
        assert_eq!(config.build_path(), PathBuf::from("/scratch/build"));

        let options = config.build_options();
        assert!(options.rpath);
        assert_eq!(options.parallel, 4);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = Config::load_from_file(std::path::Path::new("/nonexistent/ebs.toml")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_invalid_toml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "[build]\nrpath = \"maybe\"").unwrap();
        let result = Config::load_from_file(temp_file.path()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_env() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("EBS_OUTPUT", "json");
        std::env::set_var("EBS_RPATH", "yes");
        std::env::set_var("EBS_PARALLEL", "8");
        std::env::set_var("EBS_INSTALL_PATH", "/apps/software");

        let mut config = Config::default();
        config.merge_env().unwrap();

        assert_eq!(config.general.default_output, OutputFormat::Json);
        assert!(config.build.rpath);
        assert_eq!(config.build.parallel, 8);
        assert_eq!(config.install_path(), PathBuf::from("/apps/software"));

        clear_env();
    }

    #[test]
    fn test_invalid_env_value() {
        let _guard = ENV_TEST_MUTEX.lock().unwrap();
        clear_env();

        std::env::set_var("EBS_RPATH", "sometimes");

        let mut config = Config::default();
        let result = config.merge_env();
        assert!(result.is_err());

        clear_env();
    }
}
