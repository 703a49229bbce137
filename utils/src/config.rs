use serde::de::DeserializeOwned;
use std::env;

/// Loads `<FILE_NAME>.<ENV>.toml`, with `ENV` defaulting to `dev`. Values can
/// be overridden by `LEDGER__`-prefixed environment variables, using `__` to
/// step into nested tables (`LEDGER__STORE__POOL_SIZE=4`).
pub fn get_config_from_env<T>() -> Result<T, config::ConfigError>
where
    T: DeserializeOwned,
{
    let environment: String = env::var("ENV").unwrap_or_else(|_| "dev".into());
    let file_name: String = env::var("FILE_NAME")
        .map_err(|_| config::ConfigError::NotFound("FILE_NAME environment variable".into()))?;

    let file_path = format!("{}.{}.toml", file_name, environment);
    get_config_from_file(&file_path)
}

pub fn get_config_from_file<T>(file_path: &str) -> Result<T, config::ConfigError>
where
    T: DeserializeOwned,
{
    config::Config::builder()
        .add_source(config::File::with_name(file_path))
        .add_source(config::Environment::with_prefix("LEDGER").separator("__"))
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Deserialize, Debug)]
    struct Nested {
        pool_size: u32,
    }

    #[derive(Deserialize, Debug)]
    struct Settings {
        name: String,
        nested: Nested,
    }

    #[test]
    fn reads_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "name = \"ledger\"\n\n[nested]\npool_size = 3").unwrap();

        let settings: Settings = get_config_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(settings.name, "ledger");
        assert_eq!(settings.nested.pool_size, 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = get_config_from_file::<Settings>("/nonexistent/ledger.dev.toml");
        assert!(result.is_err());
    }
}
