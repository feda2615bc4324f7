use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::{self, Write};

// 永久输出的去向
enum LineOutput {
    // 终端：打印在状态行上方
    Bar,
    // 非终端（重定向、管道、cron）：状态行不绘制，永久行逐行写出
    Plain(Box<dyn Write + Send>),
    Quiet,
}

// 结构体：ProgressDisplay
// 一行可覆盖的状态行 + 若干行不会被覆盖的输出
pub struct ProgressDisplay {
    bar: ProgressBar,
    output: LineOutput,
}

impl ProgressDisplay {
    // 构造函数：状态行画在 stderr 上，stderr 不是终端时永久行改写到 stdout
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("{msg}").unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        Self::with_output(bar, Box::new(io::stdout()))
    }

    pub(crate) fn with_output(bar: ProgressBar, plain: Box<dyn Write + Send>) -> Self {
        let output = if bar.is_hidden() {
            LineOutput::Plain(plain)
        } else {
            LineOutput::Bar
        };
        ProgressDisplay { bar, output }
    }

    // 什么都不输出
    pub fn quiet() -> Self {
        ProgressDisplay {
            bar: ProgressBar::hidden(),
            output: LineOutput::Quiet,
        }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.output, LineOutput::Quiet)
    }

    /// 只有画在终端上时才带颜色
    pub fn styled(&self) -> bool {
        matches!(self.output, LineOutput::Bar)
    }

    // 覆盖当前状态行
    pub fn set_status(&self, line: String) {
        self.bar.set_message(line);
    }

    // 在状态行上方输出一行永久内容
    pub fn println(&mut self, line: impl AsRef<str>) {
        match &mut self.output {
            LineOutput::Bar => self.bar.println(line),
            LineOutput::Plain(out) => {
                let _ = writeln!(out, "{}", line.as_ref());
                let _ = out.flush();
            }
            LineOutput::Quiet => {}
        }
    }

    // 状态行清掉之后的最终摘要
    pub fn print_summary(&mut self, summary: impl AsRef<str>) {
        match &mut self.output {
            LineOutput::Bar => println!("{}", summary.as_ref()),
            LineOutput::Plain(out) => {
                let _ = writeln!(out, "{}", summary.as_ref());
                let _ = out.flush();
            }
            LineOutput::Quiet => {}
        }
    }

    // 清掉状态行
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self::new()
    }
}
