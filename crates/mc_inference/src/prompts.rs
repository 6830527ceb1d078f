use mc_core::Ministry;

pub const CLASSIFY_SYSTEM_PROMPT: &str = "Eres un asistente que responde ÚNICAMENTE con JSON válido. \
No escribas explicaciones, prosa ni bloques de código: la respuesta completa debe ser el JSON pedido.";

pub const SUMMARY_SYSTEM_PROMPT: &str = "Eres un analista que sintetiza noticias en español para equipos de gobierno. \
Redactas un único informe claro y conciso con los hechos clave para el ministerio indicado. \
Usas un tono formal, no opinas ni recomiendas y te basas solo en la información provista.";

fn label_list() -> String {
    Ministry::ALL
        .iter()
        .map(|m| m.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Instructions sent alongside the compact items of a classification batch.
pub fn classify_instructions() -> String {
    format!(
        r#"Clasifica cada item en uno o más ministerios de este conjunto exacto: {{{labels}}}.
Usa el TÍTULO, la DESCRIPCIÓN y, si está presente, el BODY (puede venir truncado).

Responde EXCLUSIVAMENTE con una lista JSON de objetos:
[
  {{"idx": <int>, "ministerio": ["{first}", "{last}"]}},
  ...
]

Reglas:
- "idx" debe ser el mismo índice recibido en el item.
- "ministerio" es una lista de valores del conjunto permitido, respetando mayúsculas y acentos.
- No agregues campos ni texto antes o después del JSON."#,
        labels = label_list(),
        first = Ministry::Health.label(),
        last = Ministry::Economy.label(),
    )
}

pub fn summary_request(ministry: Ministry, total: usize, news: &str) -> String {
    format!(
        "Ministerio objetivo: {ministry}\n\
         Cantidad de artículos: {total}\n\n\
         Información relevante (cada ítem combina título, descripción y cuerpo):\n\
         {news}\n\n\
         Escribe en Markdown simple (párrafos y, si corresponde, viñetas), sin títulos generales ni metadatos.\n\
         Redacta un único resumen narrativo en español que integre los hechos clave para este ministerio, \
         señalando tendencias, riesgos u oportunidades recurrentes en lugar de listar cada artículo."
    )
}
