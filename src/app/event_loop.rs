use std::io::{Write, stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::App;
use crate::app::frame::{FrameController, FrameOptions};
use crate::app::input::{Action, FrameInput};
use crate::document::DocumentTree;
use crate::image::ImageCache;
use crate::ui::{rasterize, render_debug_overlay};

/// Poll timeout while scrolling is animating.
const ANIMATION_POLL: Duration = Duration::from_millis(16);
/// Poll timeout while idle.
const IDLE_POLL: Duration = Duration::from_millis(250);
/// Longest frame step fed to the scroller, so a frame after idling does not
/// count the idle time as hold time.
const MAX_FRAME_DT: f32 = 0.25;

impl App {
    /// Run the viewer until the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, if terminal
    /// initialization fails, or if a frame cannot be laid out or drawn.
    pub fn run(&mut self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        // Create image picker BEFORE initializing terminal (queries stdio)
        let picker = if self.images_enabled {
            let _picker_scope = crate::perf::scope("app.create_picker");
            crate::image::create_picker(self.force_half_cell)
        } else {
            None
        };

        let read_scope = crate::perf::scope("app.read_file");
        let source = std::fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read {}", self.file_path.display()))?;
        let tree = DocumentTree::parse(&source)
            .with_context(|| format!("Failed to parse {}", self.file_path.display()))?;
        drop(read_scope);

        let base_dir = self
            .file_path
            .parent()
            .map(std::path::Path::to_path_buf)
            .unwrap_or_default();
        let images = ImageCache::new(base_dir, picker);
        let mut controller = FrameController::new(
            tree,
            images,
            FrameOptions {
                palette: self.palette,
                font_size: self.font_size,
                debug: self.debug,
            },
        );

        let init_scope = crate::perf::scope("app.ratatui_init");
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal; mdvis requires an interactive terminal")?;
        execute!(stdout(), EnableMouseCapture)?;
        set_mouse_motion_tracking(true)?;
        let release_events = matches!(crossterm::terminal::supports_keyboard_enhancement(), Ok(true));
        if release_events {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        drop(init_scope);
        tracing::debug!(release_events, truecolor = self.truecolor, "terminal initialized");

        let result = self.event_loop(&mut terminal, &mut controller, release_events);

        // Restore terminal
        if release_events {
            let _ = execute!(stdout(), PopKeyboardEnhancementFlags);
        }
        let _ = set_mouse_motion_tracking(false);
        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();

        result
    }

    fn event_loop(
        &self,
        terminal: &mut DefaultTerminal,
        controller: &mut FrameController,
        release_events: bool,
    ) -> Result<()> {
        let size = terminal.size()?;
        let mut input = FrameInput::new((size.width, size.height));
        let mut last_frame = Instant::now();
        let mut needs_frame = true;
        let truecolor = self.truecolor;

        loop {
            let poll = if needs_frame {
                Duration::ZERO
            } else if controller.is_animating(&input) {
                ANIMATION_POLL
            } else {
                IDLE_POLL
            };
            if event::poll(poll)? {
                needs_frame |= input.handle_event(&event::read()?, release_events);

                // Coalesce bursts into a single frame.
                while event::poll(Duration::ZERO)? {
                    needs_frame |= input.handle_event(&event::read()?, release_events);
                }
            }

            if input.actions.contains(&Action::Quit) {
                return Ok(());
            }
            needs_frame |= controller.is_animating(&input);
            if !needs_frame {
                continue;
            }

            let now = Instant::now();
            input.dt = now.duration_since(last_frame).as_secs_f32().min(MAX_FRAME_DT);
            last_frame = now;

            let palette = *controller.palette();
            controller.frame(&input, |commands, images, debug| {
                terminal.draw(|frame| {
                    let buf = frame.buffer_mut();
                    rasterize(commands, buf, images, &palette, truecolor);
                    if let Some(info) = debug {
                        render_debug_overlay(info, buf);
                    }
                })?;
                Ok(())
            })?;
            input.end_frame();
            needs_frame = false;

            if controller.should_quit() {
                return Ok(());
            }
        }
    }
}

fn set_mouse_motion_tracking(enable: bool) -> std::io::Result<()> {
    // Request any-event mouse motion reporting (1003) with SGR encoding (1006)
    // so hover works without a button held.
    let mut out = stdout();
    if enable {
        out.write_all(b"\x1b[?1003h\x1b[?1006h")?;
    } else {
        out.write_all(b"\x1b[?1003l\x1b[?1006l")?;
    }
    out.flush()
}
