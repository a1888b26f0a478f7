use std::io::Write;

use imecompose_core::{Color, RenderError};

use crate::layout::{DrawCommand, DrawList};

/// 描画先。1フレーム = begin → draw* → end
pub trait Presenter {
    fn begin(&mut self, background: Color) -> Result<(), RenderError>;
    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError>;
    fn end(&mut self) -> Result<(), RenderError>;
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn begin(&mut self, background: Color) -> Result<(), RenderError> {
        (**self).begin(background)
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        (**self).draw(command)
    }

    fn end(&mut self) -> Result<(), RenderError> {
        (**self).end()
    }
}

/// 描画リストを流す。個々のコマンドの失敗はスキップしてフレームを完了させる。
pub fn present<P: Presenter + ?Sized>(
    presenter: &mut P,
    list: &DrawList,
) -> Result<usize, RenderError> {
    presenter.begin(list.background)?;
    let mut drawn = 0;
    for command in &list.commands {
        match presenter.draw(command) {
            Ok(()) => drawn += 1,
            Err(e) => log::warn!("skip draw command {:?}: {}", command, e),
        }
    }
    presenter.end()?;
    Ok(drawn)
}

/// テキスト端末向け。内容が変わったフレームだけ書き出す。
pub struct ConsolePresenter<W: Write> {
    out: W,
    frame: Vec<String>,
    last_frame: Vec<String>,
    frames_written: usize,
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            frame: Vec::new(),
            last_frame: Vec::new(),
            frames_written: 0,
        }
    }

    pub fn frames_written(&self) -> usize {
        self.frames_written
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for ConsolePresenter<W> {
    fn begin(&mut self, _background: Color) -> Result<(), RenderError> {
        self.frame.clear();
        Ok(())
    }

    fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        match command {
            DrawCommand::Text { x, y, text, .. } => {
                self.frame.push(format!("({:>4},{:>4}) {}", *x as i32, *y as i32, text));
            }
            // キャレットはテキスト側のマーカーで表現されるので出力しない
            DrawCommand::Fill { .. } => {}
        }
        Ok(())
    }

    fn end(&mut self) -> Result<(), RenderError> {
        if self.frame == self.last_frame {
            return Ok(());
        }

        let write = |out: &mut W, lines: &[String], index: usize| -> std::io::Result<()> {
            writeln!(out, "--- frame {} ---", index)?;
            for line in lines {
                writeln!(out, "{}", line)?;
            }
            out.flush()
        };
        write(&mut self.out, &self.frame, self.frames_written + 1)
            .map_err(|e| RenderError::DrawFailed(e.to_string()))?;

        self.frames_written += 1;
        std::mem::swap(&mut self.frame, &mut self.last_frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imecompose_core::Rect;

    fn text(y: f32, s: &str) -> DrawCommand {
        DrawCommand::Text {
            x: 10.0,
            y,
            text: s.to_string(),
            color: Color::rgb(255, 255, 255),
        }
    }

    fn list(commands: Vec<DrawCommand>) -> DrawList {
        DrawList {
            background: Color::rgb(0, 0, 0),
            commands,
        }
    }

    #[test]
    fn unchanged_frames_are_not_rewritten() {
        let mut presenter = ConsolePresenter::new(Vec::new());
        let frame = list(vec![text(10.0, "hello")]);

        present(&mut presenter, &frame).unwrap();
        present(&mut presenter, &frame).unwrap();
        assert_eq!(presenter.frames_written(), 1);

        present(&mut presenter, &list(vec![text(10.0, "hello!")])).unwrap();
        assert_eq!(presenter.frames_written(), 2);

        let out = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(
            out,
            "--- frame 1 ---\n(  10,  10) hello\n--- frame 2 ---\n(  10,  10) hello!\n"
        );
    }

    struct Flaky {
        drawn: Vec<String>,
    }

    impl Presenter for Flaky {
        fn begin(&mut self, _background: Color) -> Result<(), RenderError> {
            Ok(())
        }

        fn draw(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
            match command {
                DrawCommand::Text { text, .. } if text.contains('!') => {
                    Err(RenderError::DrawFailed("unsupported glyph".into()))
                }
                DrawCommand::Text { text, .. } => {
                    self.drawn.push(text.clone());
                    Ok(())
                }
                DrawCommand::Fill { .. } => Ok(()),
            }
        }

        fn end(&mut self) -> Result<(), RenderError> {
            Ok(())
        }
    }

    #[test]
    fn failing_command_does_not_abort_frame() {
        let mut presenter = Flaky { drawn: Vec::new() };
        let frame = list(vec![
            text(10.0, "a"),
            text(20.0, "b!"),
            DrawCommand::Fill {
                rect: Rect::new(0, 0, 1, 1),
                color: Color::default(),
            },
            text(30.0, "c"),
        ]);

        assert_eq!(present(&mut presenter, &frame).unwrap(), 3);
        assert_eq!(presenter.drawn, vec!["a", "c"]);
    }
}
