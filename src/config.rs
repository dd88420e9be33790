//! Configuración de la aplicación.
//! Carga variables de entorno (.env) con prefijo `TEKFLOW_`; los flags del
//! CLI tienen prioridad sobre estos valores.
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

pub const DEFAULT_REPOSITORY: &str = "https://github.com/tektoncd/pipeline";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_OUTPUT: &str = "output";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// URL git o directorio local con el source inicial.
    pub repository: String,
    pub branch: String,
    /// Destino del export del agregado.
    pub output: PathBuf,
    /// Binario compatible con el CLI de docker.
    pub docker: String,
    /// Plazo total del run.
    pub timeout: Option<Duration>,
    /// Semilla para nombres de script reproducibles.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self { repository: DEFAULT_REPOSITORY.into(),
               branch: DEFAULT_BRANCH.into(),
               output: PathBuf::from(DEFAULT_OUTPUT),
               docker: "docker".into(),
               timeout: None,
               seed: None }
    }
}

impl RunConfig {
    pub fn from_env() -> Self {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables arbitraria.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self { repository: lookup("TEKFLOW_REPOSITORY").unwrap_or(defaults.repository),
               branch: lookup("TEKFLOW_BRANCH").unwrap_or(defaults.branch),
               output: lookup("TEKFLOW_OUTPUT").map(PathBuf::from).unwrap_or(defaults.output),
               docker: lookup("TEKFLOW_DOCKER").unwrap_or(defaults.docker),
               timeout: lookup("TEKFLOW_TIMEOUT_SECS").and_then(|v| v.parse().ok()).map(Duration::from_secs),
               seed: lookup("TEKFLOW_SEED").and_then(|v| v.parse().ok()) }
    }
}

/// Forzar carga temprana de .env.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_without_variables() {
        assert_eq!(RunConfig::from_lookup(|_| None), RunConfig::default());
    }

    #[test]
    fn variables_override_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([("TEKFLOW_BRANCH", "release"),
                                                       ("TEKFLOW_TIMEOUT_SECS", "90"),
                                                       ("TEKFLOW_SEED", "7"),
                                                       ("TEKFLOW_OUTPUT", "/tmp/out")]);
        let cfg = RunConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.branch, "release");
        assert_eq!(cfg.timeout, Some(Duration::from_secs(90)));
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.output, PathBuf::from("/tmp/out"));
        assert_eq!(cfg.repository, DEFAULT_REPOSITORY);
    }

    #[test]
    fn unparsable_numbers_are_ignored() {
        let cfg = RunConfig::from_lookup(|k| (k == "TEKFLOW_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert_eq!(cfg.timeout, None);
    }
}
