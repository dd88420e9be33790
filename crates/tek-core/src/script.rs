//! Materialización de scripts inline.
//!
//! Un script se convierte en un archivo ejecutable dentro de `SCRIPTS_DIR`
//! con nombre `<step>-<sufijo aleatorio>`. Si el cuerpo no declara intérprete
//! (`#!` tras quitar espacios iniciales) se antepone `DEFAULT_SCRIPT_PREAMBLE`.
//! El cálculo es puro: quien llama escribe el archivo en el contenedor y lo
//! ejecuta sin argumentos.
//!
//! La aleatoriedad se inyecta con `SuffixSource` para poder reproducir runs
//! (`SeededSuffix`) y escribir tests deterministas.

use crate::constants::{DEFAULT_SCRIPT_PREAMBLE, MAX_GENERATED_NAME_LENGTH, RANDOM_SUFFIX_LENGTH, SCRIPTS_DIR,
                       SCRIPT_PERMISSIONS};

/// Alfabeto de sufijos (sin vocales ni caracteres ambiguos).
const SUFFIX_ALPHABET: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";

/// Fuente de sufijos aleatorios.
pub trait SuffixSource: Send {
    fn next_suffix(&mut self, len: usize) -> String;
}

fn encode_suffix(bytes: impl Iterator<Item = u8>, len: usize) -> String {
    bytes.take(len)
         .map(|b| SUFFIX_ALPHABET[b as usize % SUFFIX_ALPHABET.len()] as char)
         .collect()
}

/// Sufijos a partir de UUID v4 (aleatoriedad del sistema).
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidSuffix;

impl SuffixSource for UuidSuffix {
    fn next_suffix(&mut self, len: usize) -> String {
        let mut out = String::with_capacity(len);
        while out.len() < len {
            let id = uuid::Uuid::new_v4();
            out.push_str(&encode_suffix(id.as_bytes().iter().copied(), len - out.len()));
        }
        out
    }
}

/// Sufijos reproducibles derivados de una semilla.
#[derive(Debug, Clone)]
pub struct SeededSuffix {
    seed: u64,
    counter: u64,
}

impl SeededSuffix {
    pub fn new(seed: u64) -> Self {
        Self { seed, counter: 0 }
    }
}

impl SuffixSource for SeededSuffix {
    fn next_suffix(&mut self, len: usize) -> String {
        let mut out = String::with_capacity(len);
        while out.len() < len {
            let digest = blake3::hash(format!("{}:{}", self.seed, self.counter).as_bytes());
            self.counter += 1;
            out.push_str(&encode_suffix(digest.as_bytes().iter().copied(), len - out.len()));
        }
        out
    }
}

impl<S: SuffixSource + ?Sized> SuffixSource for Box<S> {
    fn next_suffix(&mut self, len: usize) -> String {
        (**self).next_suffix(len)
    }
}

/// Script listo para escribirse en el contenedor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedScript {
    pub path: String,
    pub content: String,
    pub permissions: u32,
}

/// `true` si el script declara su intérprete.
pub fn has_shebang(body: &str) -> bool {
    body.trim_start().starts_with("#!")
}

/// Cuerpo final del script: sin cambios si trae `#!`, con preámbulo si no.
pub fn with_default_preamble(body: &str) -> String {
    if has_shebang(body) {
        body.to_string()
    } else {
        format!("{DEFAULT_SCRIPT_PREAMBLE}{body}")
    }
}

pub struct ScriptMaterializer<S: SuffixSource> {
    suffixes: S,
    scripts_dir: String,
}

impl<S: SuffixSource> ScriptMaterializer<S> {
    pub fn new(suffixes: S) -> Self {
        Self { suffixes,
               scripts_dir: SCRIPTS_DIR.to_string() }
    }

    /// `base` recortado para que `<base>-<sufijo>` no supere 63 caracteres.
    pub fn generate_name(&mut self, base: &str) -> String {
        let base = if base.is_empty() { "script" } else { base };
        let limit = MAX_GENERATED_NAME_LENGTH - RANDOM_SUFFIX_LENGTH - 1;
        let cut = base.char_indices().nth(limit).map(|(i, _)| i).unwrap_or(base.len());
        format!("{}-{}", &base[..cut], self.suffixes.next_suffix(RANDOM_SUFFIX_LENGTH))
    }

    /// Ruta, contenido y permisos del script de `step_name`. Nunca debe
    /// recibir un cuerpo vacío: ese step está en modo command.
    pub fn materialize(&mut self, step_name: &str, body: &str) -> MaterializedScript {
        debug_assert!(!body.is_empty(), "empty script bodies are command-mode steps");
        let filename = self.generate_name(step_name);
        MaterializedScript { path: format!("{}/{}", self.scripts_dir.trim_end_matches('/'), filename),
                             content: with_default_preamble(body),
                             permissions: SCRIPT_PERMISSIONS }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    impl SuffixSource for Fixed {
        fn next_suffix(&mut self, len: usize) -> String {
            self.0[..len].to_string()
        }
    }

    #[test]
    fn script_without_shebang_gets_preamble() {
        let mut m = ScriptMaterializer::new(Fixed("abcde"));
        let s = m.materialize("build", "echo hi");
        assert_eq!(s.content, "#!/bin/sh\nset -e\necho hi");
        assert_eq!(s.path, "/tekton/scripts/build-abcde");
        assert_eq!(s.permissions, 0o755);
    }

    #[test]
    fn shebang_after_whitespace_is_kept_verbatim() {
        let body = "\n   #!/usr/bin/env python3\nprint('x')\n";
        let mut m = ScriptMaterializer::new(Fixed("abcde"));
        assert_eq!(m.materialize("py", body).content, body);
    }

    #[test]
    fn long_names_are_truncated_to_label_length() {
        let mut m = ScriptMaterializer::new(SeededSuffix::new(1));
        let name = m.generate_name(&"x".repeat(100));
        assert_eq!(name.len(), 63);
        assert!(name.starts_with(&"x".repeat(57)));
    }

    #[test]
    fn seeded_suffixes_are_reproducible_and_distinct() {
        let mut a = SeededSuffix::new(42);
        let mut b = SeededSuffix::new(42);
        let first = a.next_suffix(5);
        assert_eq!(first, b.next_suffix(5));
        assert_ne!(first, a.next_suffix(5));
        assert!(first.bytes().all(|c| SUFFIX_ALPHABET.contains(&c)));
    }

    #[test]
    fn uuid_suffix_uses_alphabet() {
        let s = UuidSuffix.next_suffix(20);
        assert_eq!(s.len(), 20);
        assert!(s.bytes().all(|c| SUFFIX_ALPHABET.contains(&c)));
    }

    #[test]
    fn seeded_suffixes_span_the_whole_alphabet() {
        let mut seeded = SeededSuffix::new(3);
        let mut seen: Vec<char> = (0..200).flat_map(|_| seeded.next_suffix(5).chars().collect::<Vec<_>>()).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), SUFFIX_ALPHABET.len());
    }
}
