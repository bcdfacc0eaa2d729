use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

use super::{ParsedPortion, PortionParseError, PortionParser};

/// Canonical unit vocabulary for standardized portions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardUnit {
    Cup,
    Tablespoon,
    Teaspoon,
    FluidOunce,
    Ounce,
    Pound,
    Gram,
    Kilogram,
    Milligram,
    Microgram,
    Milliliter,
    Liter,
    Pint,
    Quart,
    Gallon,
    Piece,
    Slice,
    Can,
    Bottle,
    Container,
    Package,
    Packet,
    Serving,
    Bar,
    Stick,
    Scoop,
    Large,
    Medium,
    Small,
}

impl StandardUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardUnit::Cup => "cup",
            StandardUnit::Tablespoon => "tablespoon",
            StandardUnit::Teaspoon => "teaspoon",
            StandardUnit::FluidOunce => "fluid_ounce",
            StandardUnit::Ounce => "ounce",
            StandardUnit::Pound => "pound",
            StandardUnit::Gram => "gram",
            StandardUnit::Kilogram => "kilogram",
            StandardUnit::Milligram => "milligram",
            StandardUnit::Microgram => "microgram",
            StandardUnit::Milliliter => "milliliter",
            StandardUnit::Liter => "liter",
            StandardUnit::Pint => "pint",
            StandardUnit::Quart => "quart",
            StandardUnit::Gallon => "gallon",
            StandardUnit::Piece => "piece",
            StandardUnit::Slice => "slice",
            StandardUnit::Can => "can",
            StandardUnit::Bottle => "bottle",
            StandardUnit::Container => "container",
            StandardUnit::Package => "package",
            StandardUnit::Packet => "packet",
            StandardUnit::Serving => "serving",
            StandardUnit::Bar => "bar",
            StandardUnit::Stick => "stick",
            StandardUnit::Scoop => "scoop",
            StandardUnit::Large => "large",
            StandardUnit::Medium => "medium",
            StandardUnit::Small => "small",
        }
    }
}

impl fmt::Display for StandardUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Multi-word aliases use a single space; matched text is whitespace-collapsed
// before lookup.
const UNIT_ALIASES: &[(&str, StandardUnit)] = &[
    ("fluid ounces", StandardUnit::FluidOunce),
    ("fluid ounce", StandardUnit::FluidOunce),
    ("fl oz", StandardUnit::FluidOunce),
    ("floz", StandardUnit::FluidOunce),
    ("tablespoons", StandardUnit::Tablespoon),
    ("tablespoon", StandardUnit::Tablespoon),
    ("tbsps", StandardUnit::Tablespoon),
    ("tbsp", StandardUnit::Tablespoon),
    ("tbs", StandardUnit::Tablespoon),
    ("teaspoons", StandardUnit::Teaspoon),
    ("teaspoon", StandardUnit::Teaspoon),
    ("tsps", StandardUnit::Teaspoon),
    ("tsp", StandardUnit::Teaspoon),
    ("cups", StandardUnit::Cup),
    ("cup", StandardUnit::Cup),
    ("ounces", StandardUnit::Ounce),
    ("ounce", StandardUnit::Ounce),
    ("onz", StandardUnit::Ounce),
    ("oz", StandardUnit::Ounce),
    ("pounds", StandardUnit::Pound),
    ("pound", StandardUnit::Pound),
    ("lbs", StandardUnit::Pound),
    ("lb", StandardUnit::Pound),
    ("kilograms", StandardUnit::Kilogram),
    ("kilogram", StandardUnit::Kilogram),
    ("kg", StandardUnit::Kilogram),
    ("milligrams", StandardUnit::Milligram),
    ("milligram", StandardUnit::Milligram),
    ("mg", StandardUnit::Milligram),
    ("micrograms", StandardUnit::Microgram),
    ("microgram", StandardUnit::Microgram),
    ("mcg", StandardUnit::Microgram),
    ("ug", StandardUnit::Microgram),
    ("grams", StandardUnit::Gram),
    ("gram", StandardUnit::Gram),
    ("grm", StandardUnit::Gram),
    ("gr", StandardUnit::Gram),
    ("g", StandardUnit::Gram),
    ("milliliters", StandardUnit::Milliliter),
    ("milliliter", StandardUnit::Milliliter),
    ("millilitres", StandardUnit::Milliliter),
    ("millilitre", StandardUnit::Milliliter),
    ("mlt", StandardUnit::Milliliter),
    ("ml", StandardUnit::Milliliter),
    ("liters", StandardUnit::Liter),
    ("liter", StandardUnit::Liter),
    ("litres", StandardUnit::Liter),
    ("litre", StandardUnit::Liter),
    ("ltr", StandardUnit::Liter),
    ("l", StandardUnit::Liter),
    ("pints", StandardUnit::Pint),
    ("pint", StandardUnit::Pint),
    ("pt", StandardUnit::Pint),
    ("quarts", StandardUnit::Quart),
    ("quart", StandardUnit::Quart),
    ("qt", StandardUnit::Quart),
    ("gallons", StandardUnit::Gallon),
    ("gallon", StandardUnit::Gallon),
    ("gal", StandardUnit::Gallon),
    ("pieces", StandardUnit::Piece),
    ("piece", StandardUnit::Piece),
    ("pcs", StandardUnit::Piece),
    ("pc", StandardUnit::Piece),
    ("slices", StandardUnit::Slice),
    ("slice", StandardUnit::Slice),
    ("cans", StandardUnit::Can),
    ("can", StandardUnit::Can),
    ("bottles", StandardUnit::Bottle),
    ("bottle", StandardUnit::Bottle),
    ("containers", StandardUnit::Container),
    ("container", StandardUnit::Container),
    ("packages", StandardUnit::Package),
    ("package", StandardUnit::Package),
    ("pkgs", StandardUnit::Package),
    ("pkg", StandardUnit::Package),
    ("packets", StandardUnit::Packet),
    ("packet", StandardUnit::Packet),
    ("servings", StandardUnit::Serving),
    ("serving", StandardUnit::Serving),
    ("bars", StandardUnit::Bar),
    ("bar", StandardUnit::Bar),
    ("sticks", StandardUnit::Stick),
    ("stick", StandardUnit::Stick),
    ("scoops", StandardUnit::Scoop),
    ("scoop", StandardUnit::Scoop),
    ("extra large", StandardUnit::Large),
    ("large", StandardUnit::Large),
    ("medium", StandardUnit::Medium),
    ("small", StandardUnit::Small),
];

lazy_static! {
    static ref QUANTITY_RE: Regex = Regex::new(
        r"(?:(?P<whole>\d+)\s+(?P<mnum>\d+)\s*/\s*(?P<mden>\d+))|(?:(?P<num>\d+)\s*/\s*(?P<den>\d+))|(?P<dec>\d+(?:\.\d+)?|\.\d+)"
    )
    .unwrap();
    // Sorted longest first so "fl oz" wins over "oz" and "tbsp" over "tbs".
    static ref UNIT_RE: Regex = {
        let mut aliases: Vec<&str> = UNIT_ALIASES.iter().map(|(alias, _)| *alias).collect();
        aliases.sort_by(|a, b| b.len().cmp(&a.len()));
        let alternation = aliases
            .iter()
            .map(|a| regex::escape(a).replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?:^|[^a-z])(?P<unit>{})(?:[^a-z]|$)", alternation)).unwrap()
    };
    static ref UNIT_LOOKUP: HashMap<&'static str, StandardUnit> = UNIT_ALIASES.iter().copied().collect();
    static ref ABBREVIATION_DOT_RE: Regex = Regex::new(r"([a-z])\.").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

const VULGAR_FRACTIONS: &[(char, &str)] = &[
    ('½', "1/2"),
    ('⅓', "1/3"),
    ('⅔', "2/3"),
    ('¼', "1/4"),
    ('¾', "3/4"),
    ('⅕', "1/5"),
    ('⅛', "1/8"),
    ('⅜', "3/8"),
    ('⅝', "5/8"),
    ('⅞', "7/8"),
];

/// Default regex-driven serving-size parser.
///
/// Picks the first number in the text (integer, decimal, fraction or mixed
/// number) and the first known unit after it, falling back to the first unit
/// anywhere in the text when nothing follows the number.
#[derive(Debug, Default, Clone)]
pub struct RegexPortionParser;

impl RegexPortionParser {
    fn prepare(text: &str) -> String {
        let mut prepared = String::with_capacity(text.len() + 8);
        for c in text.to_lowercase().chars() {
            match VULGAR_FRACTIONS.iter().find(|(v, _)| *v == c) {
                Some((_, ascii)) => {
                    prepared.push(' ');
                    prepared.push_str(ascii);
                }
                None => prepared.push(c),
            }
        }
        ABBREVIATION_DOT_RE.replace_all(&prepared, "$1").into_owned()
    }

    fn parse_number(raw: &str) -> Result<f64, PortionParseError> {
        let value = raw
            .parse::<f64>()
            .map_err(|_| PortionParseError::InvalidNumber(raw.to_string()))?;
        if !value.is_finite() {
            return Err(PortionParseError::NonFiniteQuantity(raw.to_string()));
        }
        Ok(value)
    }

    fn fraction(num: &str, den: &str) -> Result<f64, PortionParseError> {
        let denominator = Self::parse_number(den)?;
        if denominator == 0.0 {
            return Err(PortionParseError::ZeroDenominator(format!("{}/{}", num, den)));
        }
        Ok(Self::parse_number(num)? / denominator)
    }

    fn quantity(text: &str) -> Result<Option<(f64, usize)>, PortionParseError> {
        let caps = match QUANTITY_RE.captures(text) {
            Some(caps) => caps,
            None => return Ok(None),
        };
        let end = caps.get(0).map(|m| m.end()).unwrap_or(0);

        let value = if let (Some(whole), Some(num), Some(den)) = (caps.name("whole"), caps.name("mnum"), caps.name("mden")) {
            Self::parse_number(whole.as_str())? + Self::fraction(num.as_str(), den.as_str())?
        } else if let (Some(num), Some(den)) = (caps.name("num"), caps.name("den")) {
            Self::fraction(num.as_str(), den.as_str())?
        } else if let Some(dec) = caps.name("dec") {
            Self::parse_number(dec.as_str())?
        } else {
            return Ok(None);
        };

        if !value.is_finite() {
            return Err(PortionParseError::NonFiniteQuantity(text.to_string()));
        }
        Ok(Some((value, end)))
    }

    fn unit(text: &str) -> Option<StandardUnit> {
        let caps = UNIT_RE.captures(text)?;
        let matched = caps.name("unit")?.as_str();
        let key = WHITESPACE_RE.replace_all(matched, " ");
        UNIT_LOOKUP.get(key.as_ref()).copied()
    }
}

impl PortionParser for RegexPortionParser {
    fn parse(&self, text: &str) -> Result<ParsedPortion, PortionParseError> {
        let prepared = Self::prepare(text);

        let (quantity, unit) = match Self::quantity(&prepared)? {
            Some((value, end)) => {
                let unit = Self::unit(&prepared[end..]).or_else(|| Self::unit(&prepared));
                (Some(value), unit)
            }
            None => (None, Self::unit(&prepared)),
        };

        Ok(ParsedPortion { quantity, unit })
    }
}
