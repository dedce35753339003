//! System prompt construction for grounded answers.
//!
//! Everything here is a pure function of its inputs.

use crate::agent::persona::AssistantPersona;

use super::pipeline::Source;

/// Longest label the model may use as citation link text.
pub const MAX_LINK_WORDS: usize = 2;

/// Builds the system prompt for one turn.
///
/// With no sources the prompt carries no citation mechanics at all. With
/// sources it lists each URL, requires a markdown link at the end of every
/// paragraph that draws on one, and limits link text to a short site name.
pub fn build_system_prompt(persona: AssistantPersona, sources: &[Source], context: &str) -> String {
    if sources.is_empty() {
        return format!("{}\n\n{}", persona.identity(), persona.plain_instructions());
    }

    let source_list = sources
        .iter()
        .map(|source| format!("- {}", source.url))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{identity}

## CÓMO CITAR (MUY IMPORTANTE)

Al final de cada párrafo donde uses información de una fuente, usa un enlace markdown así:

✅ CORRECTO: \"Info del párrafo. [Mineducación](https://mineducacion.gov.co)\"
✅ CORRECTO: \"Info del párrafo. [Colombia Aprende](https://colombiaaprende.edu.co)\"
❌ INCORRECTO: \"Fuente: [https://...](...)\" (NO pongas la URL en el texto del enlace)

**Reglas:**
1. Usa formato Markdown: `[Texto Corto](URL)`
2. El texto del enlace debe ser **SOLO EL NOMBRE DEL SITIO** (ej: \"Mineducación\", \"Wikipedia\", \"El Tiempo\").
3. MÁXIMO {max_words} PALABRAS para el texto del enlace.
4. Pon la cita al FINAL del párrafo.
5. Nunca uses la URL completa como texto del enlace.

## URLs disponibles:
{source_list}

## Info de las fuentes:
{context}

{style}",
        identity = persona.identity(),
        max_words = MAX_LINK_WORDS,
        source_list = source_list,
        context = context,
        style = persona.style(),
    )
}

/// Markdown reference footer, for replies that came back without any inline
/// citation. Empty when there is nothing to cite.
pub fn format_sources_reference(sources: &[Source]) -> String {
    if sources.is_empty() {
        return String::new();
    }

    let mut lines = vec!["\n\n---\n### 📚 Referencias".to_string()];
    for source in sources {
        lines.push(format!("- [{}]({})", source.title, source.url));
    }
    lines.join("\n")
}

/// True if the reply links to at least one of the given sources.
pub fn has_inline_citation(reply: &str, sources: &[Source]) -> bool {
    sources
        .iter()
        .any(|source| reply.contains(&format!("]({})", source.url)))
}
