#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

/// Commands understood by the client, decoded from a server token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Stop,
    SetSpeed,
    SetDiode,
    RequestFile,
    Unknown,
}

impl Command {
    /// Exact, case-sensitive match of the received bytes.
    pub fn decode(token: &[u8]) -> Self {
        match token {
            b"up" => Command::Move(Direction::Forward),
            b"down" => Command::Move(Direction::Backward),
            b"left" => Command::Move(Direction::Left),
            b"right" => Command::Move(Direction::Right),
            b"stop" => Command::Stop,
            b"speed" => Command::SetSpeed,
            b"diode" => Command::SetDiode,
            b"file" => Command::RequestFile,
            _ => Command::Unknown,
        }
    }
}

/// Strips the whitespace and NUL padding around the parameter of `speed` or
/// `diode`. Command tokens themselves are matched untrimmed.
pub fn trim_parameter(parameter: &[u8]) -> &[u8] {
    let padding = |byte: &u8| *byte == 0 || byte.is_ascii_whitespace();
    let start = parameter
        .iter()
        .position(|byte| !padding(byte))
        .unwrap_or(parameter.len());
    let end = parameter
        .iter()
        .rposition(|byte| !padding(byte))
        .map_or(start, |last| last + 1);
    &parameter[start..end]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiodeColor {
    Red,
    Blue,
    Yellow,
    Pink,
    Purple,
    Orange,
    Green,
    White,
}

impl DiodeColor {
    pub fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"red" => Some(DiodeColor::Red),
            b"blue" => Some(DiodeColor::Blue),
            b"yellow" => Some(DiodeColor::Yellow),
            b"pink" => Some(DiodeColor::Pink),
            b"purple" => Some(DiodeColor::Purple),
            b"orange" => Some(DiodeColor::Orange),
            b"green" => Some(DiodeColor::Green),
            b"white" => Some(DiodeColor::White),
            _ => None,
        }
    }

    /// Red, green and blue intensity of the first LED (0..=63).
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            DiodeColor::Red => (1, 0, 0),
            DiodeColor::Blue => (0, 0, 1),
            DiodeColor::Yellow => (63, 63, 0),
            DiodeColor::Pink => (30, 0, 10),
            DiodeColor::Purple => (20, 0, 40),
            DiodeColor::Orange => (63, 20, 0),
            DiodeColor::Green => (0, 1, 0),
            DiodeColor::White => (60, 60, 60),
        }
    }
}
