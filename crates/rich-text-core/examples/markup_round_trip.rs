//! Markup round trip example
//!
//! Builds a buffer the way a markup parser would hand it over (native formats, a list and a
//! foreign tag), edits it through the command interface and prints the markup after each step.

use rich_text_core::{
    AnnotatedBuffer, Annotation, AnnotationKind, Command, CommandResult, EditCommand,
    FormatCommand, RichTextEditor, SelectionCommand,
};

fn main() {
    println!("=== Rich text markup round trip ===\n");

    let mut buffer = AnnotatedBuffer::new("Shopping\nmilk\neggs\n");
    buffer
        .set_annotation(Annotation::new(AnnotationKind::Bold, 0, 8))
        .unwrap();
    buffer
        .set_annotation(Annotation::new(AnnotationKind::BulletList, 9, 19))
        .unwrap();
    buffer
        .set_annotation(Annotation::hidden(
            9,
            19,
            "<div class=\"groceries\">",
            "</div>",
            0,
            1,
        ))
        .unwrap();

    let mut editor = RichTextEditor::from_buffer(buffer);
    println!("1. As parsed:\n  {}\n", editor.to_markup());

    editor
        .execute_batch(vec![
            Command::Selection(SelectionCommand::Set { start: 9, end: 13 }),
            Command::Format(FormatCommand::Toggle(AnnotationKind::Highlight)),
        ])
        .unwrap();
    println!("2. Highlight 'milk':\n  {}\n", editor.to_markup());

    editor
        .execute_batch(vec![
            Command::Selection(SelectionCommand::Caret(8)),
            Command::Format(FormatCommand::Toggle(AnnotationKind::Bold)),
            Command::Edit(EditCommand::InsertText {
                text: " list".to_string(),
            }),
        ])
        .unwrap();
    println!("3. Typed ' list' after the bold title:\n  {}\n", editor.to_markup());

    if let Ok(CommandResult::Active(active)) =
        editor.execute(Command::Format(FormatCommand::Query(AnnotationKind::Bold)))
    {
        println!("4. Bold at caret: {active}");
    }

    match editor.execute(Command::Selection(SelectionCommand::Set { start: 0, end: 999 })) {
        Ok(_) => println!("5. Unexpectedly accepted an out-of-range selection"),
        Err(err) => println!("5. Rejected selection: {err}"),
    }
}
