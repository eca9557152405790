//! Recipe catalog: ingredients and cocktails loaded from JSON.
//!
//! The catalog is reference data: the engine reads it and never edits it.
//! The built-in catalog is compiled in from `data/catalog.json`.
//!
//! Loading checks that ids are unique and that every recipe item names a
//! known ingredient, so a typo in the data file surfaces at boot instead
//! of as a missing pump binding at pour time.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::recipe::{Cocktail, Ingredient};

const BUILTIN_JSON: &str = include_str!("../data/catalog.json");

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    Parse(String),
    DuplicateId(String),
    UnknownIngredient { cocktail: String, ingredient: String },
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "catalog parse error: {e}"),
            Self::DuplicateId(id) => write!(f, "duplicate catalog id '{id}'"),
            Self::UnknownIngredient {
                cocktail,
                ingredient,
            } => write!(f, "cocktail '{cocktail}' uses unknown ingredient '{ingredient}'"),
        }
    }
}

impl std::error::Error for CatalogError {}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    ingredients: Vec<Ingredient>,
    cocktails: Vec<Cocktail>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self =
            serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog shipped with the firmware.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_JSON)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        for (i, ing) in self.ingredients.iter().enumerate() {
            if self.ingredients[..i].iter().any(|o| o.id == ing.id) {
                return Err(CatalogError::DuplicateId(ing.id.clone()));
            }
        }
        for (i, c) in self.cocktails.iter().enumerate() {
            if self.cocktails[..i].iter().any(|o| o.id == c.id) {
                return Err(CatalogError::DuplicateId(c.id.clone()));
            }
            if let Some(item) = c
                .recipe
                .iter()
                .find(|item| self.ingredient(&item.ingredient_id).is_none())
            {
                return Err(CatalogError::UnknownIngredient {
                    cocktail: c.id.clone(),
                    ingredient: item.ingredient_id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn ingredients(&self) -> &[Ingredient] {
        &self.ingredients
    }

    pub fn cocktails(&self) -> &[Cocktail] {
        &self.cocktails
    }

    pub fn ingredient(&self, id: &str) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| i.id == id)
    }

    pub fn cocktail(&self, id: &str) -> Option<&Cocktail> {
        self.cocktails.iter().find(|c| c.id == id)
    }

    /// Display lines for `cocktail` with ingredient names resolved.
    pub fn summary(&self, cocktail: &Cocktail) -> Vec<String> {
        cocktail.display_summary(|id| self.ingredient(id).map(|i| i.name.as_str()))
    }
}
