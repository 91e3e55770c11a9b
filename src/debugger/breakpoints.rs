use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakpoint {
    pub symbol: String,
    /// Number gdb assigned, when its reply could be parsed.
    pub number: Option<u32>,
}

#[derive(Debug, Default)]
pub struct Breakpoints {
    points: Vec<Breakpoint>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Records a breakpoint from gdb's reply to `break <symbol>`.
    pub fn add(&mut self, symbol: &str, reply: &str) -> Option<u32> {
        let number = parse_breakpoint_number(reply);
        log::debug!("breakpoint {:?} registered at {}", number, symbol);
        self.points.push(Breakpoint {
            symbol: symbol.to_string(),
            number,
        });
        number
    }

    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.points.iter()
    }
}

/// Extracts `N` from `Breakpoint N at 0x...`.
fn parse_breakpoint_number(reply: &str) -> Option<u32> {
    reply.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("Breakpoint ")?;
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    })
}
