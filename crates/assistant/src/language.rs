//! Spoken-language detection for phone turns.

use whatlang::Lang;

/// English name of the language `text` is written in, when it is confidently
/// something other than English. Short or ambiguous transcripts give `None`.
pub fn non_english_language(text: &str) -> Option<&'static str> {
    let info = whatlang::detect(text)?;
    (info.is_reliable() && info.lang() != Lang::Eng).then(|| info.lang().eng_name())
}

/// Prepends an instruction to answer in `language` to `system_prompt`.
pub fn respond_in(language: &str, system_prompt: &str) -> String {
    format!("Please respond in {language} language. {system_prompt}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPANISH: &str = "Hola, quiero saber cuánto cuesta la mudanza de mi casa con todos \
                           los muebles, porque nos vamos a vivir a otra ciudad el próximo mes.";

    #[test]
    fn detects_spanish_speech() {
        assert_eq!(non_english_language(SPANISH), Some("Spanish"));
    }

    #[test]
    fn english_and_fragments_need_no_instruction() {
        assert_eq!(
            non_english_language(
                "Hello, I would like to know how much it costs to move my furniture \
                 from my apartment to another city next month."
            ),
            None
        );
        assert_eq!(non_english_language(""), None);
    }

    #[test]
    fn instruction_precedes_the_prompt() {
        assert_eq!(
            respond_in("French", "You are Max."),
            "Please respond in French language. You are Max."
        );
    }
}
