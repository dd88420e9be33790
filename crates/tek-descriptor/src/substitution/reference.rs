//! Reconocimiento de expresiones `$(...)`.
//!
//! Sólo las familias `params`, `context`, `workspaces`, `results` y
//! `steps.<s>.exitCode.path` son referencias; cualquier otra expresión
//! (p.ej. `$(pwd)`) es texto de shell y se conserva.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `$(params.x)`
    Whole,
    /// `$(params.x[*])`
    Star,
    /// `$(params.x[0])`
    Index(usize),
    /// `$(params.x.key)`
    Key(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Param { name: String, selector: Selector },
    Context(String),
    Workspace { name: String, field: String },
    Result(String),
    StepExitCode(String),
    /// Empieza como una familia conocida pero no tiene forma válida.
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    /// `raw` incluye `$(` y `)`.
    Expr { raw: &'a str, reference: Reference },
}

/// Divide `input` en texto y referencias. Un `$(` que no abre una referencia
/// se trata como texto y el escaneo sigue después de él, así las referencias
/// anidadas en sustituciones de shell (`$(echo $(params.x))`) se reconocen.
pub fn scan(input: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;
    while let Some(offset) = input[cursor..].find("$(") {
        let open = cursor + offset;
        let Some(close) = input[open + 2..].find(')').map(|c| open + 2 + c) else {
            break;
        };
        match parse_reference(&input[open + 2..close]) {
            Some(reference) => {
                if text_start < open {
                    segments.push(Segment::Text(&input[text_start..open]));
                }
                segments.push(Segment::Expr { raw: &input[open..=close],
                                              reference });
                cursor = close + 1;
                text_start = cursor;
            }
            None => cursor = open + 2,
        }
    }
    if text_start < input.len() {
        segments.push(Segment::Text(&input[text_start..]));
    }
    segments
}

pub fn parse_reference(inner: &str) -> Option<Reference> {
    if let Some(rest) = inner.strip_prefix("params") {
        if !(rest.starts_with('.') || rest.starts_with('[')) {
            return None;
        }
        return Some(parse_param(rest).unwrap_or_else(|| Reference::Malformed(inner.to_string())));
    }
    if let Some(rest) = inner.strip_prefix("context.") {
        return Some(Reference::Context(rest.to_string()));
    }
    if let Some(rest) = inner.strip_prefix("workspaces.") {
        return Some(match rest.rsplit_once('.') {
                        Some((name, field)) if !name.is_empty() => {
                            Reference::Workspace { name: name.to_string(),
                                                   field: field.to_string() }
                        }
                        _ => Reference::Malformed(inner.to_string()),
                    });
    }
    if let Some(rest) = inner.strip_prefix("results.") {
        return Some(match rest.strip_suffix(".path") {
                        Some(name) if !name.is_empty() => Reference::Result(name.to_string()),
                        _ => Reference::Malformed(inner.to_string()),
                    });
    }
    if let Some(rest) = inner.strip_prefix("steps.") {
        return rest.strip_suffix(".exitCode.path")
                   .filter(|name| !name.is_empty())
                   .map(|name| Reference::StepExitCode(name.to_string()));
    }
    None
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn parse_param(rest: &str) -> Option<Reference> {
    let (name, remainder) = if let Some(quoted) = rest.strip_prefix("['").or_else(|| rest.strip_prefix("[\"")) {
        let quote = if rest.starts_with("['") { "']" } else { "\"]" };
        let end = quoted.find(quote)?;
        (&quoted[..end], &quoted[end + 2..])
    } else {
        let dotted = rest.strip_prefix('.')?;
        let end = dotted.find(|c: char| !is_name_char(c)).unwrap_or(dotted.len());
        (&dotted[..end], &dotted[end..])
    };
    if name.is_empty() {
        return None;
    }

    let selector = match remainder {
        "" => Selector::Whole,
        "[*]" => Selector::Star,
        r if r.starts_with('[') && r.ends_with(']') => Selector::Index(r[1..r.len() - 1].parse().ok()?),
        r => {
            let key = r.strip_prefix('.')?;
            if key.is_empty() || !key.chars().all(is_name_char) {
                return None;
            }
            Selector::Key(key.to_string())
        }
    };
    Some(Reference::Param { name: name.to_string(),
                            selector })
}
