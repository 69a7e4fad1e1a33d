use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    actions::{
        create_recipe, engaged_recipe_ids, existing_ingredient_ids, existing_tag_ids, get_users,
        list_recipe_ingredients, list_recipe_tags, set_recipe_ingredients, set_recipe_tags,
        update_recipe_info,
    },
    constants::{
        MAX_COOKING_TIME, MAX_INGREDIENT_AMOUNT, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT,
        RECIPE_NAME_MAX_LENGTH, RECIPE_NAME_SYMBOLS,
    },
    context::Context,
    error::{HtmlError, QueryError, ValidationError},
    jwt::SessionData,
    schema::{Engagement, Id, Recipe, Tag},
    Config,
};

use super::{
    image::Base64Image,
    users::{represent_users, UserRead, BLANK, REQUIRED},
};

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct IngredientAmount {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Serialize, Debug, Clone)]
pub struct RecipeRead {
    pub id: Id,
    pub tags: Vec<Tag>,
    pub author: UserRead,
    pub ingredients: Vec<IngredientAmount>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Compact form used in engagement replies and subscription lists.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeShort {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl RecipeShort {
    pub fn from_recipe(recipe: &Recipe, config: &Config) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: config.media_link(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Read representations of `recipes` as seen by the caller, loaded in one batch per relation.
pub async fn represent_recipes(
    recipes: &[Recipe],
    session: Option<&SessionData>,
    ctx: &Context,
) -> Result<Vec<RecipeRead>, potion::Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut author_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut tags: HashMap<Id, Vec<Tag>> = HashMap::new();
    for link in list_recipe_tags(&ids, &ctx.pool).await? {
        tags.entry(link.recipe_id).or_default().push(link.into());
    }

    let mut ingredients: HashMap<Id, Vec<IngredientAmount>> = HashMap::new();
    for part in list_recipe_ingredients(&ids, &ctx.pool).await? {
        ingredients
            .entry(part.recipe_id)
            .or_default()
            .push(IngredientAmount {
                id: part.ingredient_id,
                name: part.name,
                measurement_unit: part.measurement_unit,
                amount: part.amount,
            });
    }

    let authors = get_users(&author_ids, &ctx.pool).await?;
    let authors: HashMap<Id, UserRead> = represent_users(&authors, session, ctx)
        .await?
        .into_iter()
        .map(|author| (author.id, author))
        .collect();

    let (favorited, in_cart) = match session {
        Some(session) => (
            engaged_recipe_ids(Engagement::Favorite, session.user_id, &ids, &ctx.pool).await?,
            engaged_recipe_ids(Engagement::ShoppingCart, session.user_id, &ids, &ctx.pool).await?,
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    recipes
        .iter()
        .map(|recipe| -> Result<RecipeRead, potion::Error> {
            let author = authors.get(&recipe.author_id).cloned().ok_or_else(|| {
                log::error!("Recipe {} has no author {}", recipe.id, recipe.author_id);
                HtmlError::InternalServerError.default()
            })?;

            Ok(RecipeRead {
                id: recipe.id,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                author,
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorited.contains(&recipe.id),
                is_in_shopping_cart: in_cart.contains(&recipe.id),
                name: recipe.name.to_owned(),
                image: ctx.config.media_link(&recipe.image),
                text: recipe.text.to_owned(),
                cooking_time: recipe.cooking_time,
            })
        })
        .collect()
}

pub async fn represent_recipe(
    recipe: &Recipe,
    session: Option<&SessionData>,
    ctx: &Context,
) -> Result<RecipeRead, potion::Error> {
    represent_recipes(std::slice::from_ref(recipe), session, ctx)
        .await?
        .pop()
        .ok_or_else(|| HtmlError::InternalServerError.default())
}

// Write payloads

#[derive(Deserialize, Debug, Clone)]
pub struct IngredientAmountPayload {
    pub id: Id,
    pub amount: i64,
}

/// Body of recipe POST and PATCH. Every field is optional here; creation requires all of them.
#[derive(Deserialize, Debug, Default)]
pub struct RecipePayload {
    pub ingredients: Option<Vec<IngredientAmountPayload>>,
    pub tags: Option<Vec<Id>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Base64Image,
    pub ingredients: Vec<(Id, i32)>,
    pub tags: Vec<Id>,
}

/// A partial update. Supplied lists replace the stored set.
#[derive(Debug, Clone, Default)]
pub struct RecipeChanges {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<Base64Image>,
    pub ingredients: Option<Vec<(Id, i32)>>,
    pub tags: Option<Vec<Id>>,
}

fn validate_ingredients(
    errors: &mut ValidationError,
    ingredients: Vec<IngredientAmountPayload>,
) -> Vec<(Id, i32)> {
    if ingredients.is_empty() {
        errors.add("ingredients", "Add at least one ingredient.");
        return vec![];
    }

    let mut seen = HashSet::new();
    let mut parts = Vec::with_capacity(ingredients.len());
    for ingredient in ingredients {
        if !seen.insert(ingredient.id) {
            errors.add("ingredients", "Ingredients must not repeat.");
            continue;
        }
        if !(MIN_INGREDIENT_AMOUNT..=MAX_INGREDIENT_AMOUNT).contains(&ingredient.amount) {
            errors.add(
                "ingredients",
                &format!("Amount must be between {MIN_INGREDIENT_AMOUNT} and {MAX_INGREDIENT_AMOUNT}."),
            );
            continue;
        }
        parts.push((ingredient.id, ingredient.amount as i32));
    }
    parts
}

fn validate_tags(errors: &mut ValidationError, tags: Vec<Id>) -> Vec<Id> {
    if tags.is_empty() {
        errors.add("tags", "Add at least one tag.");
        return tags;
    }

    let unique: HashSet<&Id> = tags.iter().collect();
    if unique.len() != tags.len() {
        errors.add("tags", "Tags must not repeat.");
    }
    tags
}

fn validate_cooking_time(errors: &mut ValidationError, cooking_time: i64) -> i32 {
    if !(MIN_COOKING_TIME..=MAX_COOKING_TIME).contains(&cooking_time) {
        errors.add(
            "cooking_time",
            &format!("Cooking time must be between {MIN_COOKING_TIME} and {MAX_COOKING_TIME} minutes."),
        );
        return 0;
    }
    cooking_time as i32
}

fn validate_name(errors: &mut ValidationError, name: String) -> String {
    let name = name.trim().to_string();

    if name.is_empty() {
        errors.add("name", BLANK);
    } else if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
        errors.add(
            "name",
            &format!("Ensure this field has no more than {RECIPE_NAME_MAX_LENGTH} characters."),
        );
    } else if name.chars().all(|c| c.is_numeric() || c.is_whitespace()) {
        errors.add("name", "Recipe name cannot consist of numbers only.");
    } else if !name.chars().all(|c| {
        c.is_alphanumeric() || c.is_whitespace() || RECIPE_NAME_SYMBOLS.contains(&c)
    }) {
        errors.add("name", "Recipe name contains invalid characters.");
    }
    name
}

fn validate_text(errors: &mut ValidationError, text: String) -> String {
    if text.trim().is_empty() {
        errors.add("text", BLANK);
    }
    text
}

fn validate_image(errors: &mut ValidationError, image: String) -> Option<Base64Image> {
    match Base64Image::from_data_uri(&image) {
        Ok(image) => Some(image),
        Err(message) => {
            errors.add("image", message);
            None
        }
    }
}

fn require<T>(errors: &mut ValidationError, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(field, REQUIRED);
    }
    value
}

impl RecipePayload {
    pub fn into_new_recipe(self) -> Result<NewRecipe, ValidationError> {
        let mut errors = ValidationError::new();

        let ingredients = require(&mut errors, "ingredients", self.ingredients)
            .map(|ingredients| validate_ingredients(&mut errors, ingredients));
        let tags = require(&mut errors, "tags", self.tags).map(|tags| validate_tags(&mut errors, tags));
        let image = require(&mut errors, "image", self.image)
            .and_then(|image| validate_image(&mut errors, image));
        let name = require(&mut errors, "name", self.name).map(|name| validate_name(&mut errors, name));
        let text = require(&mut errors, "text", self.text).map(|text| validate_text(&mut errors, text));
        let cooking_time = require(&mut errors, "cooking_time", self.cooking_time)
            .map(|time| validate_cooking_time(&mut errors, time));

        match (ingredients, tags, image, name, text, cooking_time) {
            (Some(ingredients), Some(tags), Some(image), Some(name), Some(text), Some(cooking_time))
                if errors.is_empty() =>
            {
                Ok(NewRecipe {
                    name,
                    text,
                    cooking_time,
                    image,
                    ingredients,
                    tags,
                })
            }
            _ => Err(errors),
        }
    }

    pub fn into_changes(self) -> Result<RecipeChanges, ValidationError> {
        let mut errors = ValidationError::new();

        let changes = RecipeChanges {
            ingredients: self
                .ingredients
                .map(|ingredients| validate_ingredients(&mut errors, ingredients)),
            tags: self.tags.map(|tags| validate_tags(&mut errors, tags)),
            image: self.image.and_then(|image| validate_image(&mut errors, image)),
            name: self.name.map(|name| validate_name(&mut errors, name)),
            text: self.text.map(|text| validate_text(&mut errors, text)),
            cooking_time: self
                .cooking_time
                .map(|time| validate_cooking_time(&mut errors, time)),
        };

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(changes)
    }
}

fn missing_references(field: &str, requested: &[Id], existing: &HashSet<Id>) -> ValidationError {
    let mut errors = ValidationError::new();
    for id in requested.iter().filter(|id| !existing.contains(id)) {
        errors.add(field, &format!("Invalid pk \"{id}\" - object does not exist."));
    }
    errors
}

/// Rejects ingredient and tag ids that are not in the catalog.
async fn check_references(
    ingredients: Option<&[(Id, i32)]>,
    tags: Option<&[Id]>,
    ctx: &Context,
) -> Result<(), potion::Error> {
    let mut errors = ValidationError::new();

    if let Some(ingredients) = ingredients {
        let ids: Vec<Id> = ingredients.iter().map(|(id, _)| *id).collect();
        let existing = existing_ingredient_ids(&ids, &ctx.pool).await?;
        errors.merge(missing_references("ingredients", &ids, &existing));
    }
    if let Some(tags) = tags {
        let existing = existing_tag_ids(tags, &ctx.pool).await?;
        errors.merge(missing_references("tags", tags, &existing));
    }

    errors.into_result()
}

impl NewRecipe {
    /// Stores the image, then writes the recipe and its links in one transaction.
    pub async fn create(self, author_id: Id, ctx: &Context) -> Result<Recipe, potion::Error> {
        check_references(Some(&self.ingredients), Some(&self.tags), ctx).await?;

        let images = ctx.images();
        let image = images.save(&self.image).await?;

        match self.insert(author_id, &image, ctx).await {
            Ok(recipe) => {
                log::info!("Created recipe {} ({})", recipe.name, recipe.id);
                Ok(recipe)
            }
            Err(e) => {
                images.remove(&image).await;
                Err(e)
            }
        }
    }

    async fn insert(&self, author_id: Id, image: &str, ctx: &Context) -> Result<Recipe, potion::Error> {
        let mut tx = ctx
            .pool
            .begin()
            .await
            .map_err(|e| QueryError::from(e).into())?;

        let recipe = create_recipe(
            author_id,
            &self.name,
            image,
            &self.text,
            self.cooking_time,
            &mut tx,
        )
        .await?;
        set_recipe_tags(recipe.id, &self.tags, &mut tx).await?;
        set_recipe_ingredients(recipe.id, &self.ingredients, &mut tx).await?;

        tx.commit().await.map_err(|e| QueryError::from(e).into())?;
        Ok(recipe)
    }
}

impl RecipeChanges {
    /// Applies the update in one transaction. A replaced image file is removed afterwards.
    pub async fn apply(self, recipe: &Recipe, ctx: &Context) -> Result<Recipe, potion::Error> {
        check_references(self.ingredients.as_deref(), self.tags.as_deref(), ctx).await?;

        let images = ctx.images();
        let image = match &self.image {
            Some(image) => Some(images.save(image).await?),
            None => None,
        };

        match self.update(recipe.id, image.as_deref(), ctx).await {
            Ok(updated) => {
                if image.is_some() {
                    images.remove(&recipe.image).await;
                }
                log::info!("Updated recipe {} ({})", updated.name, updated.id);
                Ok(updated)
            }
            Err(e) => {
                if let Some(image) = image {
                    images.remove(&image).await;
                }
                Err(e)
            }
        }
    }

    async fn update(&self, id: Id, image: Option<&str>, ctx: &Context) -> Result<Recipe, potion::Error> {
        let mut tx = ctx
            .pool
            .begin()
            .await
            .map_err(|e| QueryError::from(e).into())?;

        let recipe = update_recipe_info(
            id,
            self.name.as_deref(),
            image,
            self.text.as_deref(),
            self.cooking_time,
            &mut tx,
        )
        .await?;
        if let Some(tags) = &self.tags {
            set_recipe_tags(id, tags, &mut tx).await?;
        }
        if let Some(ingredients) = &self.ingredients {
            set_recipe_ingredients(id, ingredients, &mut tx).await?;
        }

        tx.commit().await.map_err(|e| QueryError::from(e).into())?;
        Ok(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn payload() -> RecipePayload {
        RecipePayload {
            ingredients: Some(vec![
                IngredientAmountPayload { id: 1, amount: 200 },
                IngredientAmountPayload { id: 2, amount: 3 },
            ]),
            tags: Some(vec![1, 2]),
            image: Some(IMAGE.to_string()),
            name: Some("Karelian pasties".to_string()),
            text: Some("Fold and bake.".to_string()),
            cooking_time: Some(45),
        }
    }

    #[test]
    fn complete_payload_creates_recipe() {
        let recipe = payload().into_new_recipe().unwrap();

        assert_eq!(recipe.ingredients, vec![(1, 200), (2, 3)]);
        assert_eq!(recipe.tags, vec![1, 2]);
        assert_eq!(recipe.cooking_time, 45);
        assert_eq!(recipe.image.extension, "png");
    }

    #[test]
    fn creation_requires_every_field() {
        let errors = RecipePayload::default().into_new_recipe().unwrap_err();

        for field in ["ingredients", "tags", "image", "name", "text", "cooking_time"] {
            assert_eq!(errors.messages(field), [REQUIRED], "{field}");
        }
    }

    #[test]
    fn duplicate_ingredients_and_tags_are_rejected() {
        let mut data = payload();
        data.ingredients = Some(vec![
            IngredientAmountPayload { id: 1, amount: 2 },
            IngredientAmountPayload { id: 1, amount: 5 },
        ]);
        data.tags = Some(vec![3, 3]);
        let errors = data.into_new_recipe().unwrap_err();

        assert_eq!(errors.messages("ingredients"), ["Ingredients must not repeat."]);
        assert_eq!(errors.messages("tags"), ["Tags must not repeat."]);
    }

    #[test]
    fn empty_lists_are_rejected() {
        let mut data = payload();
        data.ingredients = Some(vec![]);
        data.tags = Some(vec![]);
        let errors = data.into_new_recipe().unwrap_err();

        assert_eq!(errors.messages("ingredients").len(), 1);
        assert_eq!(errors.messages("tags").len(), 1);
    }

    #[test]
    fn bounds_are_enforced() {
        let mut data = payload();
        data.ingredients = Some(vec![IngredientAmountPayload { id: 1, amount: 0 }]);
        data.cooking_time = Some(481);
        let errors = data.into_new_recipe().unwrap_err();

        assert_eq!(errors.messages("ingredients").len(), 1);
        assert_eq!(errors.messages("cooking_time").len(), 1);

        let mut data = payload();
        data.ingredients = Some(vec![IngredientAmountPayload { id: 1, amount: 3000 }]);
        data.cooking_time = Some(1);
        assert!(data.into_new_recipe().is_ok());
    }

    #[test]
    fn recipe_names() {
        let mut errors = ValidationError::new();
        assert_eq!(
            validate_name(&mut errors, " Pea soup (thick!) ".to_string()),
            "Pea soup (thick!)"
        );
        assert!(errors.is_empty());

        validate_name(&mut errors, "12345".to_string());
        validate_name(&mut errors, "Soup <script>".to_string());
        validate_name(&mut errors, "x".repeat(201));
        assert_eq!(errors.messages("name").len(), 3);
    }

    #[test]
    fn broken_image_is_a_field_error() {
        let mut data = payload();
        data.image = Some("data:text/plain;base64,aGVsbG8=".to_string());
        let errors = data.into_new_recipe().unwrap_err();

        assert_eq!(errors.messages("image").len(), 1);
    }

    #[test]
    fn partial_update_keeps_missing_fields() {
        let changes = RecipePayload {
            name: Some("Rye bread".to_string()),
            ..Default::default()
        }
        .into_changes()
        .unwrap();

        assert_eq!(changes.name.as_deref(), Some("Rye bread"));
        assert!(changes.tags.is_none());
        assert!(changes.ingredients.is_none());
        assert!(changes.image.is_none());

        let errors = RecipePayload {
            tags: Some(vec![]),
            ..Default::default()
        }
        .into_changes()
        .unwrap_err();
        assert_eq!(errors.messages("tags").len(), 1);
    }

    #[test]
    fn unknown_references_are_listed() {
        let existing: HashSet<Id> = [1, 2].into_iter().collect();
        let errors = missing_references("tags", &[1, 5, 2, 9], &existing);

        assert_eq!(
            errors.messages("tags"),
            [
                "Invalid pk \"5\" - object does not exist.",
                "Invalid pk \"9\" - object does not exist."
            ]
        );
    }
}
