use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 120, g: 200, b: 255 };
pub const ACCENT: Color = Color::TrueColor { r: 255, g: 175, b: 95 };
pub const SEPARATOR: Color = Color::TrueColor { r: 98, g: 98, b: 98 };
pub const TEXT_DEFAULT: Color = Color::TrueColor { r: 208, g: 208, b: 208 };
pub const IPV4_ADDR: Color = Color::TrueColor { r: 135, g: 215, b: 135 };
pub const IPV4_PREFIX: Color = Color::TrueColor { r: 95, g: 175, b: 95 };
pub const MAC_ADDR: Color = Color::TrueColor { r: 215, g: 175, b: 255 };
pub const HOSTNAME: Color = Color::TrueColor { r: 255, g: 255, b: 175 };
pub const LATENCY_FAST: Color = Color::Green;
pub const LATENCY_SLOW: Color = Color::Yellow;
pub const LATENCY_LAGGY: Color = Color::Red;
