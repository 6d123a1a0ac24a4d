//! Environment-variable layer of `load_config`.
//!
//! Lives in its own test binary because it mutates the process environment.

use std::sync::Mutex;

use pspnet_core::{ConfigError, load_config};

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn set(key: &str, value: &str) {
    // SAFETY: every test in this binary holds ENV_MUTEX while touching the environment.
    unsafe { std::env::set_var(key, value) };
}

fn clear(key: &str) {
    // SAFETY: see `set`.
    unsafe { std::env::remove_var(key) };
}

#[test]
fn env_overrides_take_effect() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();

    set("PSPNET_DATASET__IMAGE_SIZE", "512");
    set("PSPNET_HYPERPARAMETERS__MAX_LR", "0.001");
    set("PSPNET_HYPERPARAMETERS__WEIGHTS_PATH", "/srv/weights/best.pt");

    let config = load_config(Some(dir.path()), None);

    clear("PSPNET_DATASET__IMAGE_SIZE");
    clear("PSPNET_HYPERPARAMETERS__MAX_LR");
    clear("PSPNET_HYPERPARAMETERS__WEIGHTS_PATH");

    let config = config.unwrap();
    assert_eq!(config.dataset.image_size, 512);
    assert_eq!(config.dataset.image_file, "images.npy");
    assert_eq!(config.hyperparameters.max_lr, 0.001);
    assert_eq!(
        config.hyperparameters.weights_path,
        std::path::PathBuf::from("/srv/weights/best.pt")
    );
    assert_eq!(config.hyperparameters.n_epochs, 100);
}

#[test]
fn env_beats_workspace_file() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let pspnet_dir = dir.path().join(".pspnet");
    std::fs::create_dir_all(&pspnet_dir).unwrap();
    std::fs::write(
        pspnet_dir.join("config.toml"),
        "[hyperparameters]\nbatch_size = 8\nn_epochs = 50\n",
    )
    .unwrap();

    set("PSPNET_HYPERPARAMETERS__BATCH_SIZE", "2");
    let config = load_config(Some(dir.path()), None);
    clear("PSPNET_HYPERPARAMETERS__BATCH_SIZE");

    let config = config.unwrap();
    assert_eq!(config.hyperparameters.batch_size, 2);
    assert_eq!(config.hyperparameters.n_epochs, 50);
}

#[test]
fn non_numeric_env_value_is_a_validation_error() {
    let _guard = ENV_MUTEX.lock().unwrap();
    let dir = tempfile::tempdir().unwrap();

    set("PSPNET_DATASET__IMAGE_SIZE", "abc");
    let result = load_config(Some(dir.path()), None);
    clear("PSPNET_DATASET__IMAGE_SIZE");

    match result {
        Err(ConfigError::Validation(err)) => {
            assert!(err.field.ends_with("image_size"), "field: {}", err.field);
            assert!(err.value.contains("abc"), "value: {}", err.value);
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
}
