//! Unit tests for error.rs
//!
//! Tests all Error variants, their Display text, and the error macros.

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_scene_error_display() {
    let err = Error::SceneError("No portal matches 'Door_A'".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Scene error"));
    assert!(display.contains("Door_A"));
}

#[test]
fn test_duplicate_item_display() {
    let err = Error::DuplicateItem("Zone 'Hall' already exists".to_string());
    assert_eq!(format!("{}", err), "Duplicate item: Zone 'Hall' already exists");
}

#[test]
fn test_item_not_found_display() {
    let err = Error::ItemNotFound("Zone type 'ZoneType_Bsp'".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Item not found"));
    assert!(display.contains("ZoneType_Bsp"));
}

#[test]
fn test_invalid_config_display() {
    let err = Error::InvalidConfig("Missing option 'PageSize'".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Invalid configuration"));
    assert!(display.contains("PageSize"));
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("Engine not initialized".to_string());
    assert!(format!("{}", err).contains("Initialization failed"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::SceneError("test".to_string());
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_debug() {
    let debug = format!("{:?}", Error::DuplicateItem("x".to_string()));
    assert!(debug.contains("DuplicateItem"));

    let debug = format!("{:?}", Error::InvalidConfig("y".to_string()));
    assert!(debug.contains("InvalidConfig"));
}

#[test]
fn test_error_clone_and_eq() {
    let err1 = Error::ItemNotFound("Portal 'P1'".to_string());
    let err2 = err1.clone();
    assert_eq!(err1, err2);
    assert_ne!(err1, Error::SceneError("Portal 'P1'".to_string()));
}

// ============================================================================
// RESULT ALIAS
// ============================================================================

fn parse_depth(text: &str) -> Result<u32> {
    text.parse::<u32>()
        .map_err(|_| Error::InvalidConfig(format!("Invalid depth '{}'", text)))
}

#[test]
fn test_result_ok() {
    assert_eq!(parse_depth("8"), Ok(8));
}

#[test]
fn test_result_err_propagates() {
    fn wrapper() -> Result<u32> {
        let depth = parse_depth("deep")?;
        Ok(depth + 1)
    }
    assert!(matches!(wrapper(), Err(Error::InvalidConfig(_))));
}

// ============================================================================
// ERROR MACROS
// ============================================================================

#[test]
fn test_engine_err_default_variant() {
    let err = crate::engine_err!("pcz::test", "bad portal {}", 3);
    assert_eq!(err, Error::SceneError("bad portal 3".to_string()));
}

#[test]
fn test_engine_err_explicit_variant() {
    let name = "Hall";
    let err = crate::engine_err!("pcz::test", DuplicateItem: "Zone '{}' already exists", name);
    assert_eq!(err, Error::DuplicateItem("Zone 'Hall' already exists".to_string()));
}

#[test]
fn test_engine_bail_returns_error() {
    fn fails(flag: bool) -> Result<u32> {
        if flag {
            crate::engine_bail!("pcz::test", ItemNotFound: "Camera '{}' not found", "main");
        }
        Ok(1)
    }
    assert_eq!(fails(false), Ok(1));
    assert_eq!(fails(true), Err(Error::ItemNotFound("Camera 'main' not found".to_string())));
}
