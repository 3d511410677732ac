//! Immutable recipe registry.

use std::collections::BTreeMap;

use crate::recipe::catalog::CATALOG;
use crate::recipe::{Recipe, RecipeInfo};
use crate::{Error, Result};

/// Name-keyed view over a set of recipes, built once at start-up and shared
/// by reference afterwards.
#[derive(Debug, Clone)]
pub struct Registry {
    recipes: BTreeMap<&'static str, Recipe>,
}

impl Registry {
    /// Build a registry from an explicit recipe list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TemplateRender`] if two recipes share a name.
    pub fn new(recipes: impl IntoIterator<Item = Recipe>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for recipe in recipes {
            if map.insert(recipe.name, recipe).is_some() {
                return Err(Error::render(recipe.name, "recipe name registered twice"));
            }
        }
        Ok(Self { recipes: map })
    }

    /// Registry over the built-in catalog.
    pub fn builtin() -> Result<Self> {
        Self::new(CATALOG.iter().copied())
    }

    /// Look up a recipe by exact name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownRecipe`] when no recipe has that name.
    pub fn lookup(&self, name: &str) -> Result<&Recipe> {
        self.recipes
            .get(name)
            .ok_or_else(|| Error::unknown_recipe(name))
    }

    /// Recipe names in sorted order.
    pub fn names(&self) -> Vec<&'static str> {
        self.recipes.keys().copied().collect()
    }

    /// Listing descriptions in name order.
    pub fn infos(&self) -> Vec<RecipeInfo> {
        self.recipes.values().map(Recipe::info).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
