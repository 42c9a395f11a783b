//! Native backend: `enigo` for pointer and keyboard, `arboard` for the
//! clipboard. Both live on a dedicated worker thread; async callers talk to
//! it over a channel and wait on a oneshot reply.

use crate::keys::{Key, KeySequence};
use crate::{Clipboard, Error, InputBackend, Point, Result};
use async_trait::async_trait;
use enigo::{Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
use std::sync::mpsc;
use std::thread;
use tokio::sync::oneshot;
use tracing::{debug, warn};

enum Command {
    Move(Point, oneshot::Sender<Result<()>>),
    Click(oneshot::Sender<Result<()>>),
    Type(String, oneshot::Sender<Result<()>>),
    Keys(KeySequence, oneshot::Sender<Result<()>>),
    Position(oneshot::Sender<Result<Point>>),
    Clipboard(String, oneshot::Sender<Result<()>>),
}

/// Handle to the native input worker.
#[derive(Clone)]
pub struct NativeInput {
    tx: mpsc::Sender<Command>,
}

impl NativeInput {
    /// Start the worker thread and connect to the display server.
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

        thread::Builder::new()
            .name("fanout-input".into())
            .spawn(move || {
                let mut enigo = match Enigo::new(&Settings::default()) {
                    Ok(e) => e,
                    Err(e) => {
                        let _ = ready_tx.send(Err(Error::Unavailable(e.to_string())));
                        return;
                    }
                };
                let mut clipboard = match arboard::Clipboard::new() {
                    Ok(c) => Some(c),
                    Err(e) => {
                        warn!("clipboard unavailable: {}", e);
                        None
                    }
                };
                let _ = ready_tx.send(Ok(()));
                debug!("native input worker started");

                for cmd in rx {
                    run(&mut enigo, clipboard.as_mut(), cmd);
                }
                debug!("native input worker stopped");
            })
            .map_err(|e| Error::Unavailable(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| Error::Unavailable("input worker exited during startup".into()))??;
        Ok(Self { tx })
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| Error::Unavailable("input worker is gone".into()))?;
        rx.await
            .map_err(|_| Error::Unavailable("input worker dropped the request".into()))?
    }
}

fn run(enigo: &mut Enigo, clipboard: Option<&mut arboard::Clipboard>, cmd: Command) {
    let input_err = |e: enigo::InputError| Error::Input(e.to_string());
    match cmd {
        Command::Move(p, reply) => {
            let _ = reply.send(enigo.move_mouse(p.x, p.y, Coordinate::Abs).map_err(input_err));
        }
        Command::Click(reply) => {
            let _ = reply.send(enigo.button(Button::Left, Direction::Click).map_err(input_err));
        }
        Command::Type(text, reply) => {
            let _ = reply.send(enigo.text(&text).map_err(input_err));
        }
        Command::Keys(seq, reply) => {
            let _ = reply.send(send_sequence(enigo, &seq));
        }
        Command::Position(reply) => {
            let _ = reply.send(
                enigo
                    .location()
                    .map(|(x, y)| Point::new(x, y))
                    .map_err(input_err),
            );
        }
        Command::Clipboard(text, reply) => {
            let result = match clipboard {
                Some(cb) => cb.set_text(text).map_err(|e| Error::Clipboard(e.to_string())),
                None => Err(Error::Clipboard("clipboard not initialized".into())),
            };
            let _ = reply.send(result);
        }
    }
}

fn native_key(key: Key) -> enigo::Key {
    match key {
        Key::Enter => enigo::Key::Return,
        Key::Tab => enigo::Key::Tab,
        Key::Escape => enigo::Key::Escape,
        Key::Space => enigo::Key::Space,
        Key::Backspace => enigo::Key::Backspace,
        Key::Delete => enigo::Key::Delete,
        Key::Up => enigo::Key::UpArrow,
        Key::Down => enigo::Key::DownArrow,
        Key::Left => enigo::Key::LeftArrow,
        Key::Right => enigo::Key::RightArrow,
        Key::Home => enigo::Key::Home,
        Key::End => enigo::Key::End,
        Key::PageUp => enigo::Key::PageUp,
        Key::PageDown => enigo::Key::PageDown,
        Key::F(n) => function_key(n),
        Key::Char(c) => enigo::Key::Unicode(c),
    }
}

fn function_key(n: u8) -> enigo::Key {
    use enigo::Key::*;
    match n {
        1 => F1,
        2 => F2,
        3 => F3,
        4 => F4,
        5 => F5,
        6 => F6,
        7 => F7,
        8 => F8,
        9 => F9,
        10 => F10,
        11 => F11,
        _ => F12,
    }
}

fn send_sequence(enigo: &mut Enigo, seq: &KeySequence) -> Result<()> {
    let input_err = |e: enigo::InputError| Error::Input(e.to_string());
    for stroke in seq.strokes() {
        let m = stroke.modifiers;
        let held: Vec<enigo::Key> = [
            (m.ctrl, enigo::Key::Control),
            (m.shift, enigo::Key::Shift),
            (m.alt, enigo::Key::Alt),
            (m.meta, enigo::Key::Meta),
        ]
        .into_iter()
        .filter_map(|(on, k)| on.then_some(k))
        .collect();

        for k in &held {
            enigo.key(*k, Direction::Press).map_err(input_err)?;
        }
        let tapped = enigo.key(native_key(stroke.key), Direction::Click);
        // Modifiers are released even when the tap failed.
        for k in held.iter().rev() {
            enigo.key(*k, Direction::Release).map_err(input_err)?;
        }
        tapped.map_err(input_err)?;
    }
    Ok(())
}

#[async_trait]
impl InputBackend for NativeInput {
    async fn move_pointer(&self, to: Point) -> Result<()> {
        self.call(|r| Command::Move(to, r)).await
    }

    async fn click(&self) -> Result<()> {
        self.call(Command::Click).await
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        self.call(|r| Command::Type(text, r)).await
    }

    async fn send_keys(&self, keys: &KeySequence) -> Result<()> {
        let keys = keys.clone();
        self.call(|r| Command::Keys(keys, r)).await
    }

    async fn pointer_position(&self) -> Result<Point> {
        self.call(Command::Position).await
    }
}

#[async_trait]
impl Clipboard for NativeInput {
    async fn write_text(&self, text: &str) -> Result<()> {
        let text = text.to_string();
        self.call(|r| Command::Clipboard(text, r)).await
    }
}
