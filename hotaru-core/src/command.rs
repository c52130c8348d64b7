//! 再生コマンド

/// 再生コマンド
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 自動再生を開始
    Play,
    /// 自動再生を停止
    Stop,
    /// 1フレーム進める
    StepForward,
    /// 1フレーム戻す
    StepBack,
    /// 先頭フレームへ戻す
    Reset,
    /// 現在のフレームを表示
    Show,
    /// ヘルプ表示
    Help,
    /// 終了
    Quit,
}

impl Command {
    /// コマンド文字列をパースする
    pub fn parse(input: &str) -> Option<Self> {
        let parts: Vec<&str> = input.trim().split_whitespace().collect();
        if parts.is_empty() {
            return None;
        }

        match parts[0] {
            "play" | "p" => Some(Command::Play),
            "stop" => Some(Command::Stop),
            "step" | "s" | "next" | "n" => Some(Command::StepForward),
            "back" | "b" | "prev" => Some(Command::StepBack),
            "reset" | "r" => Some(Command::Reset),
            "show" => Some(Command::Show),
            "help" | "h" | "?" => Some(Command::Help),
            "quit" | "q" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("play"), Some(Command::Play));
        assert_eq!(Command::parse("p"), Some(Command::Play));
        assert_eq!(Command::parse("step"), Some(Command::StepForward));
        assert_eq!(Command::parse("b"), Some(Command::StepBack));
        assert_eq!(Command::parse("reset"), Some(Command::Reset));
        assert_eq!(Command::parse("quit"), Some(Command::Quit));
        assert_eq!(Command::parse("  show  "), Some(Command::Show));
        assert_eq!(Command::parse("unknown"), None);
        assert_eq!(Command::parse(""), None);
    }
}
