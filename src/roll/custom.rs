use crate::common::{vec1, Int, NonEmpty};
use crate::error::DiceError;
use std::mem;

/// Name under which the FATE die is registered.
pub const FATE_NAME: &str = "F";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    pub value: Int,
    pub label: Option<String>,
}

impl Face {
    pub const fn new(value: Int) -> Self {
        Self { value, label: None }
    }

    pub fn labeled(value: Int, label: impl Into<String>) -> Self {
        Self {
            value,
            label: Some(label.into()),
        }
    }
}

impl From<Int> for Face {
    fn from(value: Int) -> Self {
        Self::new(value)
    }
}

/// A die whose faces are arbitrary values rather than `1..=sides`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomDie {
    pub name: Option<String>,
    pub faces: NonEmpty<Face>,
}

impl CustomDie {
    pub fn new(name: Option<String>, faces: Vec<Face>) -> Result<Self, DiceError> {
        let faces = NonEmpty::try_from_vec(faces)
            .map_err(|_| DiceError::validation("Custom die has no sides"))?;
        Ok(Self { name, faces })
    }

    pub fn inline(faces: NonEmpty<Face>) -> Self {
        Self { name: None, faces }
    }

    /// The `-`/blank/`+` die of FATE and Fudge.
    pub fn fate() -> Self {
        Self {
            name: Some(FATE_NAME.to_string()),
            faces: vec1![
                Face::labeled(-1, "-"),
                Face::labeled(0, " "),
                Face::labeled(1, "+"),
            ],
        }
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub(crate) fn payload_bytes(&self) -> usize {
        let labels: usize = self
            .faces
            .iter()
            .filter_map(|face| face.label.as_ref())
            .map(String::len)
            .sum();
        self.name.as_ref().map_or(0, String::len) + self.faces.len() * mem::size_of::<Face>() + labels
    }
}

/// Named custom dice, looked up by exact name.
#[derive(Debug, Default, Clone)]
pub struct CustomDieRegistry {
    dice: Vec<CustomDie>,
}

impl CustomDieRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a die under `name`, replacing any die already registered under it.
    pub fn register(&mut self, name: impl Into<String>, faces: Vec<Face>) -> Result<(), DiceError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DiceError::validation("Custom die name cannot be empty"));
        }
        let die = CustomDie::new(Some(name.clone()), faces)?;
        self.insert(name, die);
        Ok(())
    }

    pub(crate) fn register_fate(&mut self) {
        self.insert(FATE_NAME.to_string(), CustomDie::fate());
    }

    fn insert(&mut self, name: String, die: CustomDie) {
        match self.dice.iter_mut().find(|d| d.name.as_deref() == Some(&name)) {
            Some(existing) => *existing = die,
            None => self.dice.push(die),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&CustomDie> {
        self.dice.iter().find(|d| d.name.as_deref() == Some(name))
    }

    pub fn clear(&mut self) {
        self.dice.clear();
    }

    pub fn len(&self) -> usize {
        self.dice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dice.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CustomDie> {
        self.dice.iter()
    }
}
