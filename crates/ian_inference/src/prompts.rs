//! Prompt builders for the four generation steps.
//!
//! Pure string formatting. Requests are validated when they are built, so
//! nothing here can fail.

use ian_core::GenerationRequest;

const TITLE_LEAD: &str = "Genera un título atractivo y periodístico";
const SUMMARY_LEAD: &str = "Escribe un resumen de 2-3 oraciones";
const CONTENT_LEAD: &str = "Escribe un artículo periodístico completo";
const TAGS_LEAD: &str = "Genera 5 tags relevantes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Title,
    Summary,
    Content,
    Tags,
}

impl PromptKind {
    /// Recognizes a prompt produced by this module.
    pub fn of(prompt: &str) -> Option<Self> {
        let prompt = prompt.trim_start();
        [
            (TITLE_LEAD, PromptKind::Title),
            (SUMMARY_LEAD, PromptKind::Summary),
            (CONTENT_LEAD, PromptKind::Content),
            (TAGS_LEAD, PromptKind::Tags),
        ]
        .into_iter()
        .find(|(lead, _)| prompt.starts_with(lead))
        .map(|(_, kind)| kind)
    }
}

pub fn title_prompt(request: &GenerationRequest) -> String {
    format!(
        "{} en {} para un artículo sobre: {}.\n\
         Categoría: {}. Solo responde con el título, sin comillas ni explicaciones.",
        TITLE_LEAD,
        request.language(),
        request.topic(),
        request.category_name(),
    )
}

pub fn summary_prompt(request: &GenerationRequest, title: &str) -> String {
    format!(
        "{} en {} para un artículo periodístico sobre: {}.\n\
         Título: {}. Tono: {}. Solo responde con el resumen.",
        SUMMARY_LEAD,
        request.language(),
        request.topic(),
        title,
        request.tone(),
    )
}

pub fn content_prompt(request: &GenerationRequest, title: &str, summary: &str) -> String {
    format!(
        "{} en {} sobre: {}.\n\
         Título: {}\n\
         Resumen: {}\n\
         Categoría: {}\n\
         Tono: {}\n\n\
         El artículo debe tener:\n\
         - Introducción clara\n\
         - Desarrollo con varios párrafos\n\
         - Conclusión\n\
         - Estilo periodístico profesional\n\n\
         Escribe solo el contenido del artículo, sin incluir título ni resumen.",
        CONTENT_LEAD,
        request.language(),
        request.topic(),
        title,
        summary,
        request.category_name(),
        request.tone(),
    )
}

pub fn tag_prompt(request: &GenerationRequest) -> String {
    format!(
        "{} en {} para un artículo sobre: {}.\n\
         Categoría: {}. Responde solo con las palabras separadas por comas, sin numeración.",
        TAGS_LEAD,
        request.language(),
        request.topic(),
        request.category_name(),
    )
}
