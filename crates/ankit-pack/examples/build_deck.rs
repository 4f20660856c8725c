//! Example: assemble a package in code and write it out.
//!
//! Builds one deck holding basic and cloze notes plus a small media file.
//!
//! Run with: cargo run -p ankit-pack --example build_deck

use ankit_pack::{Deck, Model, Note, Package};

fn main() -> ankit_pack::Result<()> {
    let basic = Model::basic(0, "Basic");
    let cloze = Model::cloze(0, "Cloze");

    let mut deck = Deck::new(0, "Spanish::Basics", "Basic Spanish vocabulary");
    for (spanish, english) in [("Hola", "Hello"), ("Adios", "Goodbye"), ("uno", "one")] {
        deck.add_note(Note::new(
            basic.id(),
            vec![spanish.into(), english.into()],
            vec!["basics".into()],
        ));
    }
    deck.add_note(Note::new(
        cloze.id(),
        vec!["{{c1::Hola}}, como estas?".into(), "A greeting".into()],
        vec!["greetings".into()],
    ));

    let mut package = Package::builder()
        .model(basic)
        .model(cloze)
        .deck(deck)
        .build()?;
    package.add_media("hola.txt", b"Hola!".to_vec());

    let store = package.store();
    println!("Notes: {}", store.note_count()?);
    println!("Cards: {}", store.card_count()?);

    let output_path = std::env::temp_dir().join("spanish_basics.apkg");
    package.write_to_file(&output_path)?;

    let metadata = std::fs::metadata(&output_path)?;
    println!("Wrote {} ({} bytes)", output_path.display(), metadata.len());
    Ok(())
}
