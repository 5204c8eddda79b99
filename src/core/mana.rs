//! Mana system: colors, costs and the per-turn pool of untapped sources

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    multi::many0,
    sequence::delimited,
    IResult,
};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

/// Mana colors in MTG
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Color {
    White,
    Blue,
    Black,
    Red,
    Green,
    Colorless,
}

impl Color {
    /// WUBRG order, colorless last
    pub const ALL: [Color; 6] = [
        Color::White,
        Color::Blue,
        Color::Black,
        Color::Red,
        Color::Green,
        Color::Colorless,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_symbol(c: char) -> Option<Color> {
        match c.to_ascii_uppercase() {
            'W' => Some(Color::White),
            'U' => Some(Color::Blue),
            'B' => Some(Color::Black),
            'R' => Some(Color::Red),
            'G' => Some(Color::Green),
            'C' => Some(Color::Colorless),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => write!(f, "W"),
            Color::Blue => write!(f, "U"),
            Color::Black => write!(f, "B"),
            Color::Red => write!(f, "R"),
            Color::Green => write!(f, "G"),
            Color::Colorless => write!(f, "C"),
        }
    }
}

/// Small bit set of colors (color identity, hybrid pips, dual lands)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorSet(u8);

impl ColorSet {
    pub const fn empty() -> Self {
        ColorSet(0)
    }

    /// Every real color (WUBRG), used by "any color" producers
    pub const fn wubrg() -> Self {
        ColorSet(0b1_1111)
    }

    pub fn single(color: Color) -> Self {
        ColorSet(1 << color.index())
    }

    pub fn insert(&mut self, color: Color) {
        self.0 |= 1 << color.index();
    }

    pub fn contains(self, color: Color) -> bool {
        self.0 & (1 << color.index()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(self, other: ColorSet) -> ColorSet {
        ColorSet(self.0 | other.0)
    }

    pub fn intersects(self, other: ColorSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Color> {
        Color::ALL.into_iter().filter(move |c| self.contains(*c))
    }

    /// The only color in this set, if it has exactly one
    pub fn as_single(self) -> Option<Color> {
        if self.len() == 1 {
            self.iter().next()
        } else {
            None
        }
    }
}

impl FromIterator<Color> for ColorSet {
    fn from_iter<I: IntoIterator<Item = Color>>(iter: I) -> Self {
        let mut set = ColorSet::empty();
        for c in iter {
            set.insert(c);
        }
        set
    }
}

impl fmt::Display for ColorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.iter() {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

/// Represents a mana cost (e.g., "{2}{R}{R}" = 2 generic + 2 red)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaCost {
    pub generic: u8,
    pub white: u8,
    pub blue: u8,
    pub black: u8,
    pub red: u8,
    pub green: u8,
    pub colorless: u8,
    /// Hybrid pips such as {R/G}, each payable by any one of its colors
    pub hybrid: SmallVec<[ColorSet; 2]>,
    /// Number of {X} symbols (treated as zero when casting)
    pub x: u8,
}

impl ManaCost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse either Scryfall notation ("{1}{U}{U}") or bare notation ("1UU")
    ///
    /// Only the front face of a split cost ("{1}{U} // {3}{B}") is used.
    /// Unknown symbols are ignored rather than rejected.
    pub fn parse(s: &str) -> Self {
        let front = s.split("//").next().unwrap_or("").trim();
        if front.starts_with('{') {
            match braced_symbols(front) {
                Ok((_, symbols)) => {
                    let mut cost = ManaCost::new();
                    for symbol in symbols {
                        cost.add_symbol(symbol);
                    }
                    cost
                }
                Err(_) => ManaCost::new(),
            }
        } else {
            Self::from_string(front)
        }
    }

    /// Parse a bare mana cost string like "2RR" or "1UB"
    pub fn from_string(s: &str) -> Self {
        let mut cost = ManaCost::new();
        let mut generic_str = String::new();

        for c in s.chars() {
            match c {
                '0'..='9' => generic_str.push(c),
                'X' | 'x' => cost.x += 1,
                _ => {
                    if let Some(color) = Color::from_symbol(c) {
                        cost.add_pip(color);
                    }
                }
            }
        }

        if !generic_str.is_empty() {
            cost.generic = generic_str.parse().unwrap_or(0);
        }

        cost
    }

    fn add_symbol(&mut self, symbol: &str) {
        let symbol = symbol.trim().to_ascii_uppercase();
        if let Ok(n) = symbol.parse::<u8>() {
            self.generic = self.generic.saturating_add(n);
            return;
        }
        if symbol == "X" || symbol == "Y" || symbol == "Z" {
            self.x += 1;
            return;
        }
        if let Some((left, right)) = symbol.split_once('/') {
            let left_color = left.chars().next().and_then(Color::from_symbol);
            let right_color = right.chars().next().and_then(Color::from_symbol);
            match (left, right) {
                // Two-brid {2/W} and phyrexian {G/P} are paid with their color
                ("2", _) => {
                    if let Some(c) = right_color {
                        self.add_pip(c);
                    }
                }
                (_, "P") => {
                    if let Some(c) = left_color {
                        self.add_pip(c);
                    }
                }
                _ => {
                    if let (Some(a), Some(b)) = (left_color, right_color) {
                        self.hybrid.push([a, b].into_iter().collect());
                    }
                }
            }
            return;
        }
        if let Some(color) = symbol.chars().next().and_then(Color::from_symbol) {
            if symbol.len() == 1 {
                self.add_pip(color);
            }
        }
    }

    fn add_pip(&mut self, color: Color) {
        let slot = match color {
            Color::White => &mut self.white,
            Color::Blue => &mut self.blue,
            Color::Black => &mut self.black,
            Color::Red => &mut self.red,
            Color::Green => &mut self.green,
            Color::Colorless => &mut self.colorless,
        };
        *slot = slot.saturating_add(1);
    }

    /// Colored requirement for one color
    pub fn pips(&self, color: Color) -> u8 {
        match color {
            Color::White => self.white,
            Color::Blue => self.blue,
            Color::Black => self.black,
            Color::Red => self.red,
            Color::Green => self.green,
            Color::Colorless => self.colorless,
        }
    }

    /// Total converted mana cost (X counts as zero)
    pub fn cmc(&self) -> u8 {
        self.generic
            .saturating_add(self.white)
            .saturating_add(self.blue)
            .saturating_add(self.black)
            .saturating_add(self.red)
            .saturating_add(self.green)
            .saturating_add(self.colorless)
            .saturating_add(self.hybrid.len() as u8)
    }

    /// Colors this cost demands (including hybrid options)
    pub fn colors(&self) -> ColorSet {
        let mut set: ColorSet = Color::ALL[..5]
            .iter()
            .copied()
            .filter(|c| self.pips(*c) > 0)
            .collect();
        for h in &self.hybrid {
            set = set.union(*h);
        }
        set
    }
}

fn braced_symbols(input: &str) -> IResult<&str, Vec<&str>> {
    many0(delimited(char('{'), take_while1(|c: char| c != '}'), char('}')))(input)
}

impl fmt::Display for ManaCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in 0..self.x {
            write!(f, "{{X}}")?;
        }
        if self.generic > 0 || self.cmc() == 0 {
            write!(f, "{{{}}}", self.generic)?;
        }
        for color in Color::ALL {
            for _ in 0..self.pips(color) {
                write!(f, "{{{color}}}")?;
            }
        }
        for h in &self.hybrid {
            let parts: Vec<String> = h.iter().map(|c| c.to_string()).collect();
            write!(f, "{{{}}}", parts.join("/"))?;
        }
        Ok(())
    }
}

/// Untapped mana sources available for the rest of the current turn
///
/// Each unit of mana is tracked on its own. Single-color mana is counted per
/// color, colorless mana can only pay generic or {C}, and mana with a choice
/// of colors (dual lands, Birds of Paradise) is kept individually.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManaPool {
    pub white: u8,
    pub blue: u8,
    pub black: u8,
    pub red: u8,
    pub green: u8,
    pub colorless: u8,
    pub flexible: SmallVec<[ColorSet; 4]>,
}

impl ManaPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one untapped source producing `amount` mana, each of any one color
    /// of `produces`
    pub fn add_source(&mut self, produces: ColorSet, amount: u8) {
        if produces.is_empty() {
            return;
        }
        for _ in 0..amount {
            match produces.as_single() {
                Some(color) => self.add_color(color),
                None => self.flexible.push(produces),
            }
        }
    }

    pub fn add_color(&mut self, color: Color) {
        let slot = self.slot_mut(color);
        *slot = slot.saturating_add(1);
    }

    fn slot_mut(&mut self, color: Color) -> &mut u8 {
        match color {
            Color::White => &mut self.white,
            Color::Blue => &mut self.blue,
            Color::Black => &mut self.black,
            Color::Red => &mut self.red,
            Color::Green => &mut self.green,
            Color::Colorless => &mut self.colorless,
        }
    }

    /// Dedicated single-color source count
    pub fn count(&self, color: Color) -> u8 {
        match color {
            Color::White => self.white,
            Color::Blue => self.blue,
            Color::Black => self.black,
            Color::Red => self.red,
            Color::Green => self.green,
            Color::Colorless => self.colorless,
        }
    }

    /// Sources able to produce `color`, dedicated or flexible
    pub fn sources_of(&self, color: Color) -> u32 {
        self.count(color) as u32 + self.flexible.iter().filter(|s| s.contains(color)).count() as u32
    }

    pub fn clear(&mut self) {
        *self = ManaPool::new();
    }

    /// Total mana in pool
    pub fn total(&self) -> u32 {
        Color::ALL.iter().map(|c| self.count(*c) as u32).sum::<u32>() + self.flexible.len() as u32
    }

    /// Check if we can pay the given mana cost
    pub fn can_pay(&self, cost: &ManaCost) -> bool {
        self.after_payment(cost).is_some()
    }

    /// Pay a mana cost from this pool
    ///
    /// The pool is only modified when the whole cost can be paid.
    pub fn pay(&mut self, cost: &ManaCost) -> crate::Result<()> {
        match self.after_payment(cost) {
            Some(remaining) => {
                debug_assert!(self.total() - remaining.total() == cost.cmc() as u32);
                *self = remaining;
                Ok(())
            }
            None => Err(crate::GoldfishError::InsufficientMana {
                cost: cost.clone(),
                available: self.total(),
            }),
        }
    }

    /// The pool left over after paying `cost`, or None if it cannot be paid
    ///
    /// Colored pips are reserved before generic. Dedicated sources cover their
    /// own color first; whatever is still owed (plus hybrid pips) is matched
    /// against the remaining sources by a small exhaustive search, hardest
    /// requirement first. Generic is paid last from what is left.
    pub fn after_payment(&self, cost: &ManaCost) -> Option<ManaPool> {
        let mut pool = self.clone();
        let mut owed: SmallVec<[ColorSet; 8]> = SmallVec::new();

        for color in Color::ALL {
            let need = cost.pips(color);
            let have = pool.count(color);
            let used = need.min(have);
            *pool.slot_mut(color) -= used;
            for _ in used..need {
                owed.push(ColorSet::single(color));
            }
        }
        owed.extend(cost.hybrid.iter().copied());

        if !owed.is_empty() {
            // Fewest candidate sources first
            owed.sort_by_key(|req| (pool.candidates(*req), *req));
            let mut used_flexible: SmallVec<[bool; 4]> = SmallVec::from_elem(false, pool.flexible.len());
            if !pool.match_requirements(&owed, &mut used_flexible) {
                return None;
            }
            let mut idx = 0;
            pool.flexible.retain(|_| {
                let keep = !used_flexible[idx];
                idx += 1;
                keep
            });
        }

        if pool.total() < cost.generic as u32 {
            return None;
        }
        pool.pay_generic(cost.generic);
        Some(pool)
    }

    fn candidates(&self, req: ColorSet) -> u32 {
        req.iter().map(|c| self.count(c) as u32).sum::<u32>()
            + self.flexible.iter().filter(|s| s.intersects(req)).count() as u32
    }

    fn match_requirements(&mut self, owed: &[ColorSet], used: &mut SmallVec<[bool; 4]>) -> bool {
        let Some((&req, rest)) = owed.split_first() else {
            return true;
        };

        // Dedicated sources first (largest surplus first), then flexible ones
        // with the fewest colors so wide sources stay available.
        let mut dedicated: SmallVec<[Color; 6]> = req.iter().filter(|c| self.count(*c) > 0).collect();
        dedicated.sort_by_key(|c| (std::cmp::Reverse(self.count(*c)), *c));
        for color in dedicated {
            *self.slot_mut(color) -= 1;
            if self.match_requirements(rest, used) {
                return true;
            }
            *self.slot_mut(color) += 1;
        }

        let mut flexible: SmallVec<[usize; 4]> = (0..self.flexible.len())
            .filter(|&i| !used[i] && self.flexible[i].intersects(req))
            .collect();
        flexible.sort_by_key(|&i| (self.flexible[i].len(), i));
        for i in flexible {
            used[i] = true;
            if self.match_requirements(rest, used) {
                return true;
            }
            used[i] = false;
        }
        false
    }

    fn pay_generic(&mut self, mut generic: u8) {
        // Colorless is only good for generic, so spend it first
        let from_colorless = generic.min(self.colorless);
        self.colorless -= from_colorless;
        generic -= from_colorless;

        while generic > 0 {
            let best = Color::ALL[..5]
                .iter()
                .copied()
                .filter(|c| self.count(*c) > 0)
                .max_by_key(|c| (self.count(*c), std::cmp::Reverse(*c)));
            match best {
                Some(color) => {
                    *self.slot_mut(color) -= 1;
                    generic -= 1;
                }
                None => break,
            }
        }

        while generic > 0 {
            let narrowest = (0..self.flexible.len()).min_by_key(|&i| (self.flexible[i].len(), i));
            match narrowest {
                Some(i) => {
                    self.flexible.remove(i);
                    generic -= 1;
                }
                None => break,
            }
        }

        debug_assert_eq!(generic, 0, "Failed to pay generic cost");
    }
}
