use super::*;

#[test]
fn gather_wraps_prompt_and_keeps_call_open() {
    let xml = VoiceResponse::new()
        .gather(Gather::speech("/voice/handle_input", "Hello, this is Max."))
        .to_xml();
    assert_eq!(
        xml,
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#,
            r#"<Gather action="/voice/handle_input" input="speech" method="POST" timeout="4">"#,
            r#"<Say>Hello, this is Max.</Say></Gather></Response>"#
        )
    );
}

#[test]
fn say_escapes_markup() {
    let xml = VoiceResponse::new().say("Packing & storage <cheap>").to_xml();
    assert!(xml.contains("<Say>Packing &amp; storage &lt;cheap&gt;</Say>"));
    assert!(!xml.contains("<Gather"));
}

#[test]
fn apostrophes_and_quotes_use_the_shared_escaper() {
    let xml = VoiceResponse::new()
        .gather(Gather::speech("/voice?x=\"1\"", "We're Max's movers"))
        .to_xml();
    assert!(xml.contains(r#"action="/voice?x=&quot;1&quot;""#), "{xml}");
    assert!(xml.contains("<Say>We&#x27;re Max&#x27;s movers</Say>"), "{xml}");
}
