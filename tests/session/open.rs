use std::path::Path;

use figment::Jail;
use oneliner_bridge::{BridgeError, Config, Session};

#[test]
fn test_open_fails_fast_without_library() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "olx.toml",
            r#"
            [engine]
            library_dir = "no-such-dir"
            library_name = "olxapi.dll"
            supported_version = "15.4"
            supported_build = 17321
            "#,
        )?;
        let config = Config::from_figment(Config::figment(Path::new("olx.toml")))
            .map_err(|e| e.to_string())?;
        let err = Session::open(&config).unwrap_err();
        assert!(matches!(err, BridgeError::LibraryLoad(_)), "{err}");
        Ok(())
    });
}

#[test]
fn test_env_overrides_library_location() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "olx.toml",
            r#"
            [engine]
            library_dir = "C:/ASPEN"
            library_name = "olxapi.dll"
            supported_version = "15.4"
            supported_build = 17321
            "#,
        )?;
        jail.set_env("OLX__ENGINE__LIBRARY_DIR", "/opt/aspen");
        let config = Config::from_figment(Config::figment(Path::new("olx.toml")))
            .map_err(|e| e.to_string())?;
        assert_eq!(
            config.engine.library_path(),
            Path::new("/opt/aspen").join("olxapi.dll")
        );
        Ok(())
    });
}
