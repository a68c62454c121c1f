//! Scalar aliases, amount parsing and the block context.

use crate::error::TypesError;

/// Token amount in base units (18 decimals).
pub type Amount = u128;

/// Block height.
pub type BlockNumber = u64;

/// Seconds since the Unix epoch.
pub type Timestamp = u64;

/// One whole token (10^18 base units).
pub const TOKEN: Amount = 1_000_000_000_000_000_000;

/// Seconds in a day.
pub const DAY: Timestamp = 86_400;

/// The block a call executes in.
///
/// Voting windows are measured in block numbers; vesting and timelocks in
/// timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockContext {
    pub number: BlockNumber,
    pub timestamp: Timestamp,
}

impl BlockContext {
    pub const fn new(number: BlockNumber, timestamp: Timestamp) -> Self {
        Self { number, timestamp }
    }

    /// Move forward by `blocks` blocks and `seconds` seconds.
    pub fn advance(&mut self, blocks: BlockNumber, seconds: Timestamp) {
        self.number = self.number.saturating_add(blocks);
        self.timestamp = self.timestamp.saturating_add(seconds);
    }

    /// The block before this one, used for flash-proof snapshots.
    pub fn previous_block(&self) -> BlockNumber {
        self.number.saturating_sub(1)
    }
}

/// Parse an amount.
///
/// Plain integers are base units; a `tok` suffix means whole tokens and may
/// carry up to 18 fractional digits (`"1.5tok"`).
pub fn parse_amount(s: &str) -> Result<Amount, TypesError> {
    let s = s.trim().replace('_', "");
    let Some(tokens) = s.strip_suffix("tok") else {
        return Ok(s.parse::<Amount>()?);
    };

    let (whole, frac) = match tokens.split_once('.') {
        Some((w, f)) => (w, f),
        None => (tokens, ""),
    };
    if frac.len() > 18 {
        return Err(TypesError::InvalidAmount(format!("too many decimals in '{}'", s)));
    }

    let whole: Amount = if whole.is_empty() { 0 } else { whole.parse()? };
    let frac_units: Amount = if frac.is_empty() {
        0
    } else {
        format!("{:0<18}", frac).parse()?
    };

    whole
        .checked_mul(TOKEN)
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(|| TypesError::InvalidAmount(format!("'{}' overflows", s)))
}

/// Parse a duration in seconds: plain digits or a number with an `s`, `m`,
/// `h` or `d` suffix.
pub fn parse_duration(s: &str) -> Result<Timestamp, TypesError> {
    let s = s.trim();
    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c),
        _ => (s, 's'),
    };
    let value: Timestamp = digits
        .trim()
        .replace('_', "")
        .parse()
        .map_err(|e| TypesError::InvalidDuration(format!("'{}': {}", s, e)))?;
    let scale = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3_600,
        'd' => DAY,
        other => {
            return Err(TypesError::InvalidDuration(format!(
                "unknown unit '{}' in '{}'",
                other, s
            )))
        }
    };
    value
        .checked_mul(scale)
        .ok_or_else(|| TypesError::InvalidDuration(format!("'{}' overflows", s)))
}
