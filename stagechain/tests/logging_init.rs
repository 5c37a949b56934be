//! Global subscriber installation, isolated in its own test binary.

use stagechain::errors::StagechainError;
use stagechain::observability::{init_logging, LogFormat, LoggingConfig};

#[test]
fn test_second_init_fails() {
    let config = LoggingConfig::new()
        .with_filter("off")
        .with_format(LogFormat::Json);

    assert!(init_logging(&config).is_ok());

    let again = init_logging(&config);
    assert!(matches!(again, Err(StagechainError::Logging(_))));
}
