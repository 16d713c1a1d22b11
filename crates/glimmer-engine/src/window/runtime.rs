use anyhow::{Context, Result, anyhow};
use ouroboros::self_referencing;

use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit};
use crate::input::{InputEvent, InputFrame, InputState, Key, KeyState};
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: PhysicalSize<u32>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "glimmer".to_string(),
            initial_size: PhysicalSize::new(800, 700),
        }
    }
}

/// Runtime context passed to the application.
///
/// The only command is force-close; it is buffered and applied after the
/// frame callback returns.
#[derive(Default)]
pub struct RuntimeCtx {
    exit_requested: bool,
}

impl RuntimeCtx {
    /// Requests that the window close after this frame. Idempotent.
    pub fn exit(&mut self) {
        self.exit_requested = true;
    }
}

/// One-way open/closed flag for the window.
///
/// Set by an OS close request or by the application's force-close; once
/// closed it never reopens.
#[derive(Debug)]
pub struct OpenState {
    open: bool,
}

impl OpenState {
    pub fn new() -> Self {
        Self { open: true }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Idempotent; no effect if already closed.
    pub fn request_close(&mut self) {
        self.open = false;
    }
}

impl Default for OpenState {
    fn default() -> Self {
        Self::new()
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Runs the frame loop until the window closes or the app exits.
    ///
    /// Initialization failures (window, GPU context, surface) are returned
    /// as errors; the loop is never entered in an unusable state.
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        if let Some(err) = state.startup_error.take() {
            return Err(err);
        }

        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    input_state: InputState,
    input_frame: InputFrame,
    clock: FrameClock,

    window: Window,

    // Surface creation can fail; the entry is only retained when this is Ok,
    // but ouroboros requires the fallible build to store a Result.
    #[borrows(window)]
    #[covariant]
    gpu: Result<Gpu<'this>>,
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    entry: Option<WindowEntry>,
    open: OpenState,
    startup_error: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            entry: None,
            open: OpenState::new(),
            startup_error: None,
        }
    }

    fn create_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let gpu_init = self.gpu_init.clone();

        let entry = WindowEntryBuilder {
            input_state: InputState::default(),
            input_frame: InputFrame::default(),
            clock: FrameClock::default(),
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .build();

        if let Err(e) = entry.borrow_gpu() {
            return Err(anyhow!("GPU initialization failed: {e:#}"));
        }

        self.entry = Some(entry);
        Ok(())
    }

    fn apply_input_event(&mut self, ev: InputEvent) {
        if let Some(entry) = self.entry.as_mut() {
            entry.with_mut(|fields| fields.input_state.apply_event(fields.input_frame, ev));
        }
    }

    fn drive_frame(&mut self) -> AppControl {
        let mut runtime_ctx = RuntimeCtx::default();
        let mut control = AppControl::Continue;

        // Split borrows so `self.app` is usable inside the ouroboros closure.
        let (app, entry) = (&mut self.app, self.entry.as_mut());

        if let Some(entry) = entry {
            entry.with_mut(|fields| {
                let Ok(gpu) = fields.gpu.as_mut() else {
                    return;
                };

                let time = fields.clock.tick();

                // Scope so `ctx` drops before the frame deltas are cleared.
                {
                    let mut ctx = FrameCtx {
                        window: WindowCtx {
                            window: fields.window,
                        },
                        gpu,
                        input: fields.input_state,
                        input_frame: fields.input_frame,
                        time,
                        runtime: &mut runtime_ctx,
                    };

                    control = app.on_frame(&mut ctx);
                }

                fields.input_frame.clear();
            });
        }

        if runtime_ctx.exit_requested {
            control = AppControl::Exit;
        }

        control
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.is_some() {
            return;
        }

        if let Err(e) = self.create_window(event_loop) {
            log::error!("startup failed: {e:#}");
            self.startup_error = Some(e);
            self.open.request_close();
            event_loop.exit();
            return;
        }

        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if !self.open.is_open() {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: the path tracer animates every frame.
        if let Some(entry) = self.entry.as_ref() {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.open.request_close();
                event_loop.exit();
            }

            // Resize handling is the single writer of the surface size; it
            // runs here, during the event phase, so the frame that follows
            // always reads up-to-date dimensions.
            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.entry.as_mut() {
                    entry.with_mut(|fields| {
                        if let Ok(gpu) = fields.gpu.as_mut() {
                            gpu.resize(new_size);
                        }
                    });
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.entry.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_mut(|fields| {
                        if let Ok(gpu) = fields.gpu.as_mut() {
                            gpu.resize(new_size);
                        }
                    });
                }
            }

            WindowEvent::Focused(f) => {
                self.apply_input_event(InputEvent::Focused(f));
            }

            WindowEvent::KeyboardInput { event: key_event, .. } => {
                let state = match key_event.state {
                    ElementState::Pressed => KeyState::Pressed,
                    ElementState::Released => KeyState::Released,
                };
                let key = map_key(key_event.physical_key);

                self.apply_input_event(InputEvent::Key {
                    key,
                    state,
                    repeat: key_event.repeat,
                });
            }

            WindowEvent::RedrawRequested => {
                if self.drive_frame() == AppControl::Exit {
                    self.open.request_close();
                }

                if self.open.is_open() {
                    if let Some(entry) = self.entry.as_ref() {
                        entry.with_window(|w| w.request_redraw());
                    }
                } else {
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

fn map_key(pk: PhysicalKey) -> Key {
    match pk {
        PhysicalKey::Code(code) => match code {
            KeyCode::Escape => Key::Escape,
            KeyCode::Space => Key::Space,
            KeyCode::Enter => Key::Enter,

            KeyCode::KeyA => Key::A,
            KeyCode::KeyB => Key::B,
            KeyCode::KeyC => Key::C,
            KeyCode::KeyD => Key::D,
            KeyCode::KeyE => Key::E,
            KeyCode::KeyF => Key::F,
            KeyCode::KeyG => Key::G,
            KeyCode::KeyH => Key::H,
            KeyCode::KeyI => Key::I,
            KeyCode::KeyJ => Key::J,
            KeyCode::KeyK => Key::K,
            KeyCode::KeyL => Key::L,
            KeyCode::KeyM => Key::M,
            KeyCode::KeyN => Key::N,
            KeyCode::KeyO => Key::O,
            KeyCode::KeyP => Key::P,
            KeyCode::KeyQ => Key::Q,
            KeyCode::KeyR => Key::R,
            KeyCode::KeyS => Key::S,
            KeyCode::KeyT => Key::T,
            KeyCode::KeyU => Key::U,
            KeyCode::KeyV => Key::V,
            KeyCode::KeyW => Key::W,
            KeyCode::KeyX => Key::X,
            KeyCode::KeyY => Key::Y,
            KeyCode::KeyZ => Key::Z,

            KeyCode::Digit0 => Key::Digit0,
            KeyCode::Digit1 => Key::Digit1,
            KeyCode::Digit2 => Key::Digit2,
            KeyCode::Digit3 => Key::Digit3,
            KeyCode::Digit4 => Key::Digit4,
            KeyCode::Digit5 => Key::Digit5,
            KeyCode::Digit6 => Key::Digit6,
            KeyCode::Digit7 => Key::Digit7,
            KeyCode::Digit8 => Key::Digit8,
            KeyCode::Digit9 => Key::Digit9,

            other => Key::Unknown(other as u32),
        },

        // NativeKeyCode carries no stable numeric identity.
        PhysicalKey::Unidentified(_) => Key::Unknown(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_state_starts_open() {
        assert!(OpenState::new().is_open());
    }

    #[test]
    fn close_is_one_way() {
        let mut open = OpenState::new();
        open.request_close();
        assert!(!open.is_open());
    }

    #[test]
    fn close_is_idempotent() {
        let mut open = OpenState::new();
        open.request_close();
        open.request_close();
        assert!(!open.is_open());
    }

    #[test]
    fn runtime_ctx_exit_is_idempotent() {
        let mut ctx = RuntimeCtx::default();
        ctx.exit();
        ctx.exit();
        assert!(ctx.exit_requested);
    }

    #[test]
    fn reload_key_maps_to_h() {
        assert_eq!(map_key(PhysicalKey::Code(KeyCode::KeyH)), Key::H);
    }
}
