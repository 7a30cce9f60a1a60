use std::collections::HashSet;

use super::tower::Tower;
use crate::error::TowerError;

/// A named collection of towers a surface can pick from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Complex {
    name: String,
    towers: Vec<Tower>,
}

impl Complex {
    pub fn new(name: &str, towers: Vec<Tower>) -> Result<Self, TowerError> {
        let mut seen = HashSet::new();
        for tower in &towers {
            if !seen.insert(tower.name()) {
                return Err(TowerError::DuplicateTower {
                    complex: name.to_string(),
                    name: tower.name().to_string(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            towers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn towers(&self) -> &[Tower] {
        &self.towers
    }

    pub fn get(&self, tower: &str) -> Option<&Tower> {
        self.towers.iter().find(|t| t.name() == tower)
    }

    pub fn require(&self, tower: &str) -> Result<&Tower, TowerError> {
        self.get(tower).ok_or_else(|| TowerError::TowerNotFound {
            complex: self.name.clone(),
            name: tower.to_string(),
        })
    }

    /// The member after `tower`, wrapping around
    pub fn next_after(&self, tower: &str) -> Option<&Tower> {
        let index = self.towers.iter().position(|t| t.name() == tower)?;
        self.towers.get((index + 1) % self.towers.len())
    }

    /// Replace the member sharing `tower`'s name. Returns false if there is none.
    pub fn update_named_member(&mut self, tower: Tower) -> bool {
        match self.towers.iter_mut().find(|t| t.name() == tower.name()) {
            Some(slot) => {
                *slot = tower;
                true
            }
            None => false,
        }
    }
}
