//! Constantes del motor core.
//!
//! Este módulo agrupa rutas fijas dentro del contenedor de cada step y valores
//! estáticos que participan en el cálculo de fingerprints. Cambios en estas
//! constantes afectan la reproducibilidad de los fingerprints de step y de run.

/// Versión lógica del motor. Se incluye en el fingerprint de cada step para
/// que un cambio de versión invalide los fingerprints aunque la definición y
/// los snapshots no cambien.
pub const ENGINE_VERSION: &str = "T1.0";

/// Nombre distinguido del workspace que transporta el código fuente.
pub const SOURCE_WORKSPACE: &str = "source";

/// Raíz donde se monta el workspace `source`; también es el workdir de cada step.
pub const SOURCE_ROOT: &str = "/workspace/source";

/// Prefijo para workspaces sin `mountPath` declarado.
pub const WORKSPACE_ROOT: &str = "/workspace";

/// Directorio donde se materializan los scripts inline.
pub const SCRIPTS_DIR: &str = "/tekton/scripts";

/// Directorio de resultados de la task (`$(results.<x>.path)`).
pub const RESULTS_DIR: &str = "/tekton/results";

/// Preámbulo para scripts sin intérprete declarado (`#!`).
pub const DEFAULT_SCRIPT_PREAMBLE: &str = "#!/bin/sh\nset -e\n";

/// Permisos de los scripts materializados.
pub const SCRIPT_PERMISSIONS: u32 = 0o755;

/// Permisos por defecto de archivos importados sin información de modo.
pub const DEFAULT_FILE_PERMISSIONS: u32 = 0o644;

/// Longitud máxima de un nombre generado (límite DNS-1123 label).
pub const MAX_GENERATED_NAME_LENGTH: usize = 63;

/// Longitud del sufijo aleatorio de los nombres de script.
pub const RANDOM_SUFFIX_LENGTH: usize = 5;

/// Rutas de salida agregadas entre steps (hoy sólo la raíz del source).
pub const TRACKED_OUTPUT_PATHS: &[&str] = &[SOURCE_ROOT];
