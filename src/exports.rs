pub use {
    anyhow,
    chrono,
    itertools,
    log,
    pretty_env_logger,
    rayon,
    serde,
    serde_json,
};
