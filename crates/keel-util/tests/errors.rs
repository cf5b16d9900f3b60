use keel_util::errors::KeelError;

#[test]
fn test_io_error_display() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
    let err = KeelError::from(io_err);
    assert!(err.to_string().contains("I/O error"), "got: {err}");
}

#[test]
fn test_configuration_error_display() {
    let err = KeelError::Configuration {
        message: "duplicate namespace 'maven'".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Configuration error: duplicate namespace 'maven'"
    );
}

#[test]
fn test_invalid_pattern_display() {
    let err = KeelError::InvalidPattern {
        kind: "regexp".to_string(),
        pattern: "(".to_string(),
        message: "unclosed group".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Invalid regexp pattern '(': unclosed group"
    );
}

#[test]
fn test_invalid_argument_display() {
    let err = KeelError::InvalidArgument {
        message: "null candidate".to_string(),
    };
    assert_eq!(err.to_string(), "Invalid argument: null candidate");
}

#[test]
fn test_strict_conflict_display_is_message_verbatim() {
    let err = KeelError::StrictConflict {
        message: "a#b;1.0 (needed by [x#y;1]) conflicts with a#b;2.0 (needed by [z#w;1])"
            .to_string(),
    };
    assert!(err.to_string().starts_with("a#b;1.0 (needed by"));
}

#[test]
fn test_parse_error_display() {
    let err = KeelError::Parse {
        message: "missing ';'".to_string(),
    };
    assert_eq!(err.to_string(), "Parse error: missing ';'");
}

#[test]
fn test_io_error_from_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err: KeelError = io_err.into();
    assert!(matches!(err, KeelError::Io(_)));
}
