use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use tempfile::{TempDir, tempdir};

use crate::document::DocumentTree;
use crate::image::ImageCache;
use crate::layout::{CommandKind, Vector2};
use crate::ui::style::{BASE_FONT_SIZE, MAX_FONT_SIZE, MIN_FONT_SIZE};

use super::input::translate_key;
use super::*;

fn key(code: KeyCode, kind: KeyEventKind) -> Event {
    Event::Key(KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind,
        state: KeyEventState::NONE,
    })
}

fn press(code: KeyCode) -> Event {
    key(code, KeyEventKind::Press)
}

fn mouse(kind: MouseEventKind, column: u16, row: u16) -> Event {
    Event::Mouse(MouseEvent {
        kind,
        column,
        row,
        modifiers: KeyModifiers::NONE,
    })
}

fn long_document() -> String {
    let mut md = String::from("# Test Document\n\n");
    for i in 1..=50 {
        md.push_str(&format!("Line {i} of content.\n\n"));
    }
    md
}

fn create_controller(md: &str) -> (FrameController, TempDir) {
    let dir = tempdir().unwrap();
    let tree = DocumentTree::parse(md).unwrap();
    let images = ImageCache::new(dir.path(), None);
    (
        FrameController::new(tree, images, FrameOptions::default()),
        dir,
    )
}

fn run_frame(controller: &mut FrameController, input: &FrameInput) -> Vec<String> {
    let mut texts = Vec::new();
    controller
        .frame(input, |commands, _, _| {
            texts = commands
                .iter()
                .filter_map(|c| match c.kind {
                    CommandKind::Text { text, .. } => Some(text.to_string()),
                    _ => None,
                })
                .collect();
            Ok(())
        })
        .unwrap();
    texts
}

fn input_with(actions: &[Action]) -> FrameInput {
    let mut input = FrameInput::new((80, 24));
    input.actions.extend_from_slice(actions);
    input.dt = 0.016;
    input
}

// ---------------------------------------------------------------------------
// input translation

#[test]
fn test_translate_key_maps_actions() {
    let plain = |code| KeyEvent::new(code, KeyModifiers::NONE);
    assert_eq!(translate_key(plain(KeyCode::Char('q'))), Some(Action::Quit));
    assert_eq!(
        translate_key(plain(KeyCode::Char('='))),
        Some(Action::IncreaseFont)
    );
    assert_eq!(
        translate_key(plain(KeyCode::Char('+'))),
        Some(Action::IncreaseFont)
    );
    assert_eq!(
        translate_key(plain(KeyCode::Char('-'))),
        Some(Action::DecreaseFont)
    );
    assert_eq!(translate_key(plain(KeyCode::Char('0'))), Some(Action::ResetFont));
    assert_eq!(translate_key(plain(KeyCode::Backspace)), Some(Action::ToggleDebug));
    assert_eq!(translate_key(plain(KeyCode::Char('g'))), Some(Action::ScrollToTop));
    assert_eq!(
        translate_key(plain(KeyCode::Char('G'))),
        Some(Action::ScrollToBottom)
    );
    assert_eq!(translate_key(plain(KeyCode::Char('x'))), None);
}

#[test]
fn test_ctrl_c_quits() {
    let event = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
    assert_eq!(translate_key(event), Some(Action::Quit));
    let event = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL);
    assert_eq!(translate_key(event), None);
}

#[test]
fn test_scroll_key_press_and_release_with_release_events() {
    let mut input = FrameInput::new((80, 24));
    assert!(input.handle_event(&press(KeyCode::Char('j')), true));
    assert!(input.keys.is_held(ScrollKey::Down));
    assert!(input.keys.was_pressed(ScrollKey::Down));
    assert!(input.actions.is_empty());

    input.end_frame();
    assert!(input.keys.is_held(ScrollKey::Down));
    assert!(!input.keys.was_pressed(ScrollKey::Down));

    // Terminal repeat of a held key is not a new edge
    assert!(!input.handle_event(&key(KeyCode::Char('j'), KeyEventKind::Repeat), true));
    assert!(!input.keys.was_pressed(ScrollKey::Down));

    assert!(input.handle_event(&key(KeyCode::Char('j'), KeyEventKind::Release), true));
    assert!(!input.keys.is_held(ScrollKey::Down));
}

#[test]
fn test_scroll_key_without_release_events_is_edge_only() {
    let mut input = FrameInput::new((80, 24));
    input.handle_event(&press(KeyCode::Char('k')), false);
    assert!(input.keys.was_pressed(ScrollKey::Up));
    assert!(!input.keys.is_held(ScrollKey::Up));

    input.end_frame();
    input.handle_event(&press(KeyCode::Char('k')), false);
    assert!(input.keys.was_pressed(ScrollKey::Up));
}

#[test]
fn test_mouse_events_update_pointer_and_wheel() {
    let mut input = FrameInput::new((80, 24));
    input.handle_event(&mouse(MouseEventKind::Moved, 10, 5), false);
    assert_eq!(input.pointer, Some((10.0, 5.0)));

    input.handle_event(&mouse(MouseEventKind::ScrollDown, 10, 5), false);
    input.handle_event(&mouse(MouseEventKind::ScrollDown, 10, 5), false);
    input.handle_event(&mouse(MouseEventKind::ScrollLeft, 10, 5), false);
    assert_eq!(input.wheel, Vector2::new(1.0, -2.0));

    input.handle_event(&mouse(MouseEventKind::Down(MouseButton::Left), 3, 4), false);
    assert!(input.pointer_down);
    input.handle_event(&mouse(MouseEventKind::Up(MouseButton::Left), 3, 4), false);
    assert!(!input.pointer_down);

    input.end_frame();
    assert!(input.wheel.is_zero());
    assert_eq!(input.pointer, Some((3.0, 4.0)));
}

#[test]
fn test_resize_event_updates_window() {
    let mut input = FrameInput::new((80, 24));
    assert!(input.handle_event(&Event::Resize(100, 30), false));
    assert_eq!(input.window, (100, 30));
    assert!(!input.handle_event(&Event::FocusGained, false));
}

// ---------------------------------------------------------------------------
// key scroller

fn drain(scroller: &mut KeyScroller, keys: &KeyboardState, dt: f32, frames: usize) -> Vector2 {
    let mut total = Vector2::ZERO;
    for _ in 0..frames {
        if let Some(delta) = scroller.update(keys, 40.0, dt) {
            total.x += delta.x;
            total.y += delta.y;
        }
    }
    total
}

#[test]
fn test_press_edge_scrolls_immediately() {
    let mut scroller = KeyScroller::new();
    let mut keys = KeyboardState::default();
    keys.press(ScrollKey::Down, false);

    let first = scroller.update(&keys, 40.0, 0.016).unwrap();
    assert!(first.y < 0.0);
    assert_eq!(first.x, 0.0);
}

#[test]
fn test_single_nudge_totals_small_step() {
    let mut scroller = KeyScroller::new();
    let mut keys = KeyboardState::default();
    keys.press(ScrollKey::Down, false);
    let mut total = drain(&mut scroller, &keys, 0.016, 1);
    keys.clear_edges();
    let rest = drain(&mut scroller, &keys, 0.016, 200);
    total.y += rest.y;

    // 3% of 40 rows, minus the tail below the emit threshold
    assert!((total.y + 1.2).abs() < 0.1, "total {}", total.y);
    assert!(!scroller.is_moving());
}

#[test]
fn test_half_page_keys_move_half_the_viewport() {
    let mut scroller = KeyScroller::new();
    let mut keys = KeyboardState::default();
    keys.press(ScrollKey::HalfPageUp, false);
    let mut total = drain(&mut scroller, &keys, 0.016, 1);
    keys.clear_edges();
    total.y += drain(&mut scroller, &keys, 0.016, 300).y;
    assert!((total.y - 20.0).abs() < 0.2, "total {}", total.y);
}

#[test]
fn test_horizontal_keys_scroll_sideways() {
    let mut scroller = KeyScroller::new();
    let mut keys = KeyboardState::default();
    keys.press(ScrollKey::Left, false);
    let delta = scroller.update(&keys, 40.0, 0.016).unwrap();
    assert!(delta.x > 0.0);
    assert_eq!(delta.y, 0.0);

    let mut scroller = KeyScroller::new();
    let mut keys = KeyboardState::default();
    keys.press(ScrollKey::Right, false);
    assert!(scroller.update(&keys, 40.0, 0.016).unwrap().x < 0.0);
}

#[test]
fn test_hold_waits_before_repeating() {
    let mut scroller = KeyScroller::new();
    let mut keys = KeyboardState::default();
    keys.press(ScrollKey::Down, true);
    let mut total = drain(&mut scroller, &keys, 0.05, 1);
    keys.clear_edges();

    // Held for 0.25 s: still inside the initial delay
    total.y += drain(&mut scroller, &keys, 0.05, 5).y;
    keys.release(ScrollKey::Down);
    total.y += drain(&mut scroller, &keys, 0.05, 100).y;
    assert!((total.y + 1.2).abs() < 0.1, "total {}", total.y);
}

#[test]
fn test_hold_repeats_after_delay() {
    let mut scroller = KeyScroller::new();
    let mut keys = KeyboardState::default();
    keys.press(ScrollKey::Down, true);
    let mut total = drain(&mut scroller, &keys, 0.05, 1);
    keys.clear_edges();

    // One second of holding: delay, then a repeat roughly every 0.1 s
    total.y += drain(&mut scroller, &keys, 0.05, 20).y;
    keys.release(ScrollKey::Down);
    total.y += drain(&mut scroller, &keys, 0.05, 100).y;
    assert!(total.y < -1.2 * 4.0, "total {}", total.y);
}

#[test]
fn test_stop_clears_motion() {
    let mut scroller = KeyScroller::new();
    let mut keys = KeyboardState::default();
    keys.press(ScrollKey::HalfPageDown, false);
    scroller.update(&keys, 40.0, 0.016);
    assert!(scroller.is_moving());
    scroller.stop();
    assert!(!scroller.is_moving());
    keys.clear_edges();
    assert_eq!(scroller.update(&keys, 40.0, 0.016), None);
}

// ---------------------------------------------------------------------------
// frame controller

#[test]
fn test_char_budget_follows_width_and_font() {
    assert_eq!(char_budget(120, 22).get(), 120);
    assert_eq!(char_budget(120, 44).get(), 60);
    assert_eq!(char_budget(80, 11).get(), 160);
    assert_eq!(char_budget(0, 22).get(), 1);
}

#[test]
fn test_frame_presents_document_text() {
    let (mut controller, _dir) = create_controller("# Hello\n\nSome body text.");
    let texts = run_frame(&mut controller, &input_with(&[]));
    assert_eq!(texts, vec!["Hello", "Some body text."]);
    assert_eq!(controller.char_budget().get(), 80);
}

#[test]
fn test_wheel_scrolls_three_rows_per_notch() {
    let (mut controller, _dir) = create_controller(&long_document());
    run_frame(&mut controller, &input_with(&[]));

    let mut input = input_with(&[]);
    input.wheel = Vector2::new(0.0, -1.0);
    run_frame(&mut controller, &input);
    let offset = controller.state().root_scroll().unwrap().offset;
    assert_eq!(offset.y, -WHEEL_ROWS);

    input.wheel = Vector2::new(0.0, 5.0);
    run_frame(&mut controller, &input);
    assert_eq!(controller.state().root_scroll().unwrap().offset.y, 0.0);
}

#[test]
fn test_wheel_takes_priority_over_keys() {
    let (mut controller, _dir) = create_controller(&long_document());
    run_frame(&mut controller, &input_with(&[]));

    let mut input = input_with(&[]);
    input.wheel = Vector2::new(0.0, -1.0);
    input.keys.press(ScrollKey::HalfPageDown, false);
    run_frame(&mut controller, &input);
    assert_eq!(controller.state().root_scroll().unwrap().offset.y, -WHEEL_ROWS);
    assert!(!controller.is_animating(&input_with(&[])));
}

#[test]
fn test_key_scroll_moves_document() {
    let (mut controller, _dir) = create_controller(&long_document());
    run_frame(&mut controller, &input_with(&[]));

    let mut input = input_with(&[]);
    input.keys.press(ScrollKey::HalfPageDown, false);
    run_frame(&mut controller, &input);
    input.end_frame();
    assert!(controller.is_animating(&input));
    for _ in 0..200 {
        run_frame(&mut controller, &input);
    }
    let offset = controller.state().root_scroll().unwrap().offset.y;
    assert!((offset + 12.0).abs() < 0.5, "offset {offset}");
}

#[test]
fn test_scroll_to_bottom_and_top() {
    let (mut controller, _dir) = create_controller(&long_document());
    run_frame(&mut controller, &input_with(&[]));

    run_frame(&mut controller, &input_with(&[Action::ScrollToBottom]));
    let root = controller.state().root_scroll().unwrap();
    assert!(root.max_scroll().y > 0.0);
    assert_eq!(root.offset.y, -root.max_scroll().y);

    let texts = run_frame(&mut controller, &input_with(&[]));
    assert!(texts.contains(&"Line 50 of content.".to_string()));
    assert!(!texts.contains(&"Test Document".to_string()));

    run_frame(&mut controller, &input_with(&[Action::ScrollToTop]));
    assert_eq!(controller.state().root_scroll().unwrap().offset.y, 0.0);
}

#[test]
fn test_font_actions_step_clamp_and_reset() {
    let (mut controller, _dir) = create_controller("text");
    run_frame(&mut controller, &input_with(&[Action::IncreaseFont]));
    assert_eq!(controller.font_size(), BASE_FONT_SIZE + 2);
    assert_eq!(controller.char_budget(), char_budget(80, BASE_FONT_SIZE + 2));

    let many_up = vec![Action::IncreaseFont; 40];
    run_frame(&mut controller, &input_with(&many_up));
    assert_eq!(controller.font_size(), MAX_FONT_SIZE);

    let many_down = vec![Action::DecreaseFont; 40];
    run_frame(&mut controller, &input_with(&many_down));
    assert_eq!(controller.font_size(), MIN_FONT_SIZE);

    run_frame(&mut controller, &input_with(&[Action::ResetFont]));
    assert_eq!(controller.font_size(), BASE_FONT_SIZE);
}

#[test]
fn test_debug_toggle_passes_overlay_info() {
    let (mut controller, _dir) = create_controller("# Title\n\nbody");
    let mut seen = None;
    controller
        .frame(&input_with(&[Action::ToggleDebug]), |commands, _, debug| {
            seen = debug.copied().map(|info| (info, commands.len()));
            Ok(())
        })
        .unwrap();
    let (info, count) = seen.unwrap();
    assert_eq!(info.commands, count);
    assert!(info.elements > 0);
    assert_eq!(info.font_size, BASE_FONT_SIZE);
    assert_eq!(info.char_budget, 80);

    controller
        .frame(&input_with(&[Action::ToggleDebug]), |_, _, debug| {
            assert!(debug.is_none());
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_quit_action_sets_flag() {
    let (mut controller, _dir) = create_controller("text");
    assert!(!controller.should_quit());
    run_frame(&mut controller, &input_with(&[Action::Quit]));
    assert!(controller.should_quit());
}

#[test]
fn test_capacity_errors_grow_and_retry() {
    let (controller, _dir) = create_controller(&long_document());
    let mut controller = controller.with_layout_capacity(4, 2);
    let texts = run_frame(&mut controller, &input_with(&[]));
    assert!(!texts.is_empty());
    assert!(controller.state().max_elements() > 4);
    assert!(controller.state().max_measured_text() > 2);
}

#[test]
fn test_present_error_propagates() {
    let (mut controller, _dir) = create_controller("text");
    let result = controller.frame(&input_with(&[]), |_, _, _| anyhow::bail!("draw failed"));
    assert_eq!(result.unwrap_err().to_string(), "draw failed");
}

#[test]
fn test_frames_are_repeatable() {
    let (mut controller, _dir) = create_controller(&long_document());
    let first = run_frame(&mut controller, &input_with(&[]));
    let second = run_frame(&mut controller, &input_with(&[]));
    assert_eq!(first, second);
}

#[test]
fn test_deeply_nested_quotes_render_without_overflow() {
    // Run on a main-thread sized stack; test threads default to 2 MiB.
    let handle = std::thread::Builder::new()
        .stack_size(8 * 1024 * 1024)
        .spawn(|| {
            let md = format!("{}deep\n\nafter\n", "> ".repeat(1500));
            let (mut controller, _dir) = create_controller(&md);
            run_frame(&mut controller, &input_with(&[]))
        })
        .unwrap();
    let texts = handle.join().unwrap();
    assert!(!texts.iter().any(|t| t == "deep"));
    assert!(texts.iter().any(|t| t == "after"));
}
