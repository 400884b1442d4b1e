/// PCZ Engine - Singleton access point for scene managers and logging
///
/// This module provides global, named scene-manager singletons and the global
/// logger. It uses thread-safe static storage with RwLock so a host engine can
/// reach its scene managers from anywhere.

use std::sync::{OnceLock, RwLock, Arc, Mutex};
use std::time::SystemTime;
use rustc_hash::FxHashMap;
use crate::scene::PczSceneManager;
use crate::error::{Result, Error};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Internal state structure holding all engine singletons
struct EngineState {
    /// Named scene managers (each wrapped in a Mutex for mutable access)
    scene_managers: RwLock<FxHashMap<String, Arc<Mutex<PczSceneManager>>>>,
}

impl EngineState {
    /// Create a new empty engine state
    fn new() -> Self {
        Self {
            scene_managers: RwLock::new(FxHashMap::default()),
        }
    }
}

fn logger_lock() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())))
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// Manages the lifecycle of the named scene managers and the global logger.
///
/// # Example
///
/// ```no_run
/// use pcz_scene::pcz::Engine;
///
/// Engine::initialize()?;
/// let sm = Engine::create_scene_manager("world")?;
/// {
///     let mut sm = sm.lock().unwrap();
///     sm.create_zone("ZoneType_Octree", "Hall")?;
/// }
/// Engine::shutdown();
/// # Ok::<(), pcz_scene::pcz::Error>(())
/// ```
pub struct Engine;

impl Engine {
    /// Helper to log errors before returning them (internal use)
    fn log_and_return_error(error: Error) -> Error {
        match &error {
            Error::InitializationFailed(msg) => {
                crate::engine_error!("pcz::Engine", "Initialization failed: {}", msg);
            }
            _ => {
                crate::engine_error!("pcz::Engine", "Engine error: {}", error);
            }
        }
        error
    }

    fn state() -> Result<&'static EngineState> {
        ENGINE_STATE.get()
            .ok_or_else(|| Self::log_and_return_error(
                Error::InitializationFailed("Engine not initialized. Call Engine::initialize() first.".to_string())
            ))
    }

    /// Initialize the engine
    ///
    /// Must be called once at application startup before creating scene managers.
    /// Calling it again is harmless.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Shutdown the engine and destroy all scene managers
    ///
    /// Existing `Arc` handles stay valid until dropped.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut managers) = state.scene_managers.write() {
                managers.clear();
            }
        }
    }

    // ===== SCENE MANAGER API =====

    /// Create and register a named scene manager
    ///
    /// The new manager is initialized with a `ZoneType_Default` default zone.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique scene manager name
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The engine is not initialized
    /// - A scene manager with this name already exists
    pub fn create_scene_manager(name: &str) -> Result<Arc<Mutex<PczSceneManager>>> {
        let state = Self::state()?;

        let mut managers = state.scene_managers.write()
            .map_err(|_| Self::log_and_return_error(
                Error::SceneError("Scene manager lock poisoned".to_string())
            ))?;

        if managers.contains_key(name) {
            return Err(Self::log_and_return_error(
                Error::DuplicateItem(format!(
                    "Scene manager '{}' already exists. Call Engine::destroy_scene_manager() first.", name
                ))
            ));
        }

        let manager = Arc::new(Mutex::new(PczSceneManager::new(name)?));
        managers.insert(name.to_string(), manager.clone());

        crate::engine_info!("pcz::Engine", "Scene manager '{}' created", name);

        Ok(manager)
    }

    /// Get a named scene manager
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or the manager does not exist.
    pub fn scene_manager(name: &str) -> Result<Arc<Mutex<PczSceneManager>>> {
        let state = Self::state()?;

        let managers = state.scene_managers.read()
            .map_err(|_| Self::log_and_return_error(
                Error::SceneError("Scene manager lock poisoned".to_string())
            ))?;

        managers.get(name)
            .cloned()
            .ok_or_else(|| Self::log_and_return_error(
                Error::ItemNotFound(format!("Scene manager '{}' not found", name))
            ))
    }

    /// Destroy a named scene manager
    ///
    /// Destroying a manager that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized.
    pub fn destroy_scene_manager(name: &str) -> Result<()> {
        let state = Self::state()?;

        let mut managers = state.scene_managers.write()
            .map_err(|_| Self::log_and_return_error(
                Error::SceneError("Scene manager lock poisoned".to_string())
            ))?;

        if managers.remove(name).is_some() {
            crate::engine_info!("pcz::Engine", "Scene manager '{}' destroyed", name);
        }

        Ok(())
    }

    /// Number of registered scene managers (0 if the engine is not initialized)
    pub fn scene_manager_count() -> usize {
        ENGINE_STATE.get()
            .and_then(|state| state.scene_managers.read().ok().map(|m| m.len()))
            .unwrap_or(0)
    }

    /// Names of the registered scene managers
    pub fn scene_manager_names() -> Vec<String> {
        ENGINE_STATE.get()
            .and_then(|state| state.scene_managers.read().ok().map(|m| m.keys().cloned().collect()))
            .unwrap_or_default()
    }

    /// Reset all singletons for testing (only available in test builds)
    #[cfg(test)]
    pub fn reset_for_testing() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut managers) = state.scene_managers.write() {
                managers.clear();
            }
        }
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// # Arguments
    ///
    /// * `logger` - Any type implementing the Logger trait
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to the default console logger
    pub fn reset_logger() {
        if let Ok(mut lock) = logger_lock().write() {
            *lock = Box::new(DefaultLogger::default());
        }
    }

    /// Internal logging method (for simple logs without file:line)
    ///
    /// Used by macros like engine_info!, engine_warn!, etc.
    ///
    /// # Arguments
    ///
    /// * `severity` - Log severity level
    /// * `source` - Source module (e.g., "pcz::SceneManager")
    /// * `message` - Log message
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Internal logging method with file:line information (for ERROR logs)
    ///
    /// # Arguments
    ///
    /// * `severity` - Log severity level (typically Error)
    /// * `source` - Source module
    /// * `message` - Log message
    /// * `file` - Source file path
    /// * `line` - Source line number
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        if let Ok(lock) = logger_lock().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
