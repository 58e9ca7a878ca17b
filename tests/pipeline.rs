//! End-to-end: markdown source to terminal cells.

use std::num::NonZeroUsize;

use mdvis::app::{Action, FrameController, FrameInput, FrameOptions};
use mdvis::document::DocumentTree;
use mdvis::image::ImageCache;
use mdvis::layout::{CommandKind, LayoutBuilder, LayoutState};
use mdvis::render::{RenderContext, render_document};
use mdvis::ui::rasterize;
use mdvis::ui::style::{Palette, StyleTable};
use ratatui::Terminal;
use ratatui::backend::TestBackend;

const SAMPLE: &str = include_str!("fixtures/sample.md");

fn screen(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let width = usize::from(buffer.area.width);
    buffer
        .content()
        .chunks(width)
        .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn draw(controller: &mut FrameController, terminal: &mut Terminal<TestBackend>, input: &FrameInput) {
    controller
        .frame(input, |commands, images, _| {
            terminal.draw(|frame| rasterize(commands, frame.buffer_mut(), images, &Palette::DARK, false))?;
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_sample_document_reaches_the_screen() {
    let dir = tempfile::tempdir().unwrap();
    let tree = DocumentTree::parse(SAMPLE).unwrap();
    let mut controller =
        FrameController::new(tree, ImageCache::new(dir.path(), None), FrameOptions::default());
    let mut terminal = Terminal::new(TestBackend::new(100, 60)).unwrap();

    draw(&mut controller, &mut terminal, &FrameInput::new((100, 60)));
    let text = screen(&terminal);

    assert!(text.contains("mdvis sample"));
    assert!(text.contains("First ordered item"));
    assert!(text.contains("‣"));
    assert!(text.contains("☐"));
    assert!(text.contains("☑"));
    assert!(text.contains("fn main() {"));
    assert!(text.contains("Image not loaded: does-not-exist.png"));
}

#[test]
fn test_scroll_to_bottom_reveals_the_end() {
    let dir = tempfile::tempdir().unwrap();
    let tree = DocumentTree::parse(SAMPLE).unwrap();
    let mut controller =
        FrameController::new(tree, ImageCache::new(dir.path(), None), FrameOptions::default());
    let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();

    let mut input = FrameInput::new((60, 16));
    draw(&mut controller, &mut terminal, &input);
    assert!(screen(&terminal).contains("mdvis sample"));
    assert!(!screen(&terminal).contains("Final paragraph."));

    input.actions.push(Action::ScrollToBottom);
    draw(&mut controller, &mut terminal, &input);
    let text = screen(&terminal);
    assert!(text.contains("Final paragraph."));
    assert!(!text.contains("mdvis sample"));
}

#[test]
fn test_layout_commands_without_a_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let tree = DocumentTree::parse("# Title\n\nbody text").unwrap();
    let mut images = ImageCache::new(dir.path(), None);
    let styles = StyleTable::default();
    let palette = Palette::DARK;
    let mut state = LayoutState::new(80.0, 24.0);

    let mut ui = LayoutBuilder::new(&state);
    let mut ctx = RenderContext::new(&styles, &palette, NonZeroUsize::new(80).unwrap(), &mut images);
    render_document(&mut ctx, &mut ui, &tree).unwrap();
    let layout = ui.finish().unwrap();
    let commands = state.compute(&layout).unwrap();

    let texts: Vec<&str> = commands
        .iter()
        .filter_map(|c| match c.kind {
            CommandKind::Text { text, .. } => Some(text),
            _ => None,
        })
        .collect();
    assert_eq!(texts, ["Title", "body text"]);
    assert!(matches!(commands[0].kind, CommandKind::Rectangle { .. }));
    assert!(matches!(commands[1].kind, CommandKind::ScissorStart));
    assert!(matches!(commands.last().map(|c| &c.kind), Some(CommandKind::ScissorEnd)));
}
