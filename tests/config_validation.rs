#![allow(missing_docs)]

use std::{collections::HashMap, path::PathBuf};

use sweetshop_upload::{
    config::{ENV_MAX_FILE_SIZE, ENV_UPLOAD_DIR},
    ConfigError, FilenamePolicy, Limits, MimeFilter, UploadBuilder, UploadConfig, DEFAULT_FILE_SIZE,
};

#[test]
fn default_config_is_valid() {
    let config = UploadConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.destination, PathBuf::from("uploads"));
    assert_eq!(config.limits.file_size, 5 * 1024 * 1024);
    assert_eq!(config.mime_filter, MimeFilter::ImagesOnly);
}

#[test]
fn rejects_empty_destination() {
    let config = UploadConfig {
        destination: PathBuf::new(),
        ..UploadConfig::default()
    };
    assert!(matches!(config.validate(), Err(ConfigError::EmptyDestination)));
}

#[test]
fn rejects_zero_limits() {
    let config = UploadConfig {
        limits: Limits::default().with_file_size(0),
        ..UploadConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidLimitValue { limit: "file_size" })
    ));

    let config = UploadConfig {
        limits: Limits::default().with_files(0),
        ..UploadConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidLimitValue { limit: "files" })
    ));
}

#[test]
fn rejects_invalid_mime_pattern() {
    let config = UploadConfig {
        mime_filter: MimeFilter::patterns(["image"]),
        ..UploadConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidMimePattern { .. })
    ));
}

#[test]
fn rejects_placeholder_that_would_not_survive_sanitizing() {
    let config = UploadConfig {
        filename: FilenamePolicy {
            placeholder: "a b".to_owned(),
            ..FilenamePolicy::default()
        },
        ..UploadConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidPlaceholder { .. })
    ));
}

#[test]
fn rejects_extension_with_dot() {
    let config = UploadConfig {
        filename: FilenamePolicy {
            allowed_extensions: vec![".png".to_owned()],
            ..FilenamePolicy::default()
        },
        ..UploadConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidExtension { .. })
    ));
}

#[test]
fn reads_overrides_from_lookup() {
    let vars = HashMap::from([
        (ENV_UPLOAD_DIR, "/srv/sweets/uploads"),
        (ENV_MAX_FILE_SIZE, "1048576"),
    ]);
    let config = UploadConfig::from_lookup(|name| vars.get(name).map(|value| (*value).to_owned()))
        .expect("lookup config should be valid");

    assert_eq!(config.destination, PathBuf::from("/srv/sweets/uploads"));
    assert_eq!(config.limits.file_size, 1_048_576);
}

#[test]
fn missing_variables_keep_defaults() {
    let config = UploadConfig::from_lookup(|_| None).expect("defaults should be valid");
    assert_eq!(config, UploadConfig::default());
    assert_eq!(config.limits.file_size, DEFAULT_FILE_SIZE);
}

#[test]
fn rejects_unparsable_size_variable() {
    let result = UploadConfig::from_lookup(|name| {
        (name == ENV_MAX_FILE_SIZE).then(|| "five megs".to_owned())
    });
    assert!(matches!(
        result,
        Err(ConfigError::InvalidEnvValue { name: ENV_MAX_FILE_SIZE, .. })
    ));

    let result = UploadConfig::from_lookup(|name| (name == ENV_MAX_FILE_SIZE).then(|| "0".to_owned()));
    assert!(matches!(result, Err(ConfigError::InvalidLimitValue { .. })));
}

#[test]
fn builder_validation_surfaces_config_errors() {
    let result = UploadBuilder::new().destination("").build_config();
    assert!(matches!(result, Err(ConfigError::EmptyDestination)));
}
