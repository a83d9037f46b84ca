//! The built-in recipe book.

#[derive(Debug, PartialEq, Eq)]
pub struct Recipe {
    pub name: &'static str,
    pub recipe_yield: &'static str,
    pub ingredients: &'static [&'static str],
    pub instructions: &'static [&'static str],
}

pub static RECIPES: &[Recipe] = &[
    Recipe {
        name: "Pancakes",
        recipe_yield: "Makes 8 pancakes",
        ingredients: &[
            "100g plain flour",
            "2 large eggs",
            "300ml semi-skimmed milk",
            "1 tbsp sunflower oil",
            "pinch of salt",
        ],
        instructions: &[
            "Put the flour, eggs, milk, oil and salt into a bowl and whisk to a smooth batter.",
            "Set aside for 30 minutes to rest.",
            "Heat a lightly oiled frying pan over a medium heat.",
            "Cook each pancake for 1 minute on each side until golden.",
        ],
    },
    Recipe {
        name: "Tomato Soup",
        recipe_yield: "Serves 4",
        ingredients: &[
            "1kg ripe tomatoes",
            "1 onion",
            "2 garlic cloves",
            "2 tbsp olive oil",
            "500ml vegetable stock",
        ],
        instructions: &[
            "Chop the onion and garlic and soften them in the oil for 5 minutes.",
            "Add the chopped tomatoes and cook for 10 minutes.",
            "Pour in the stock and simmer for 15 minutes.",
            "Blend until smooth and season to taste.",
        ],
    },
];

/// Looks a recipe up by name, ignoring case.
pub fn find(name: &str) -> Option<&'static Recipe> {
    let name = name.trim();
    RECIPES
        .iter()
        .find(|recipe| recipe.name.eq_ignore_ascii_case(name))
}

impl Recipe {
    /// The ingredient line sharing the longest common substring with `query`.
    pub fn closest_ingredient(&self, query: &str) -> Option<&'static str> {
        let query = query.to_lowercase();
        let mut best: Option<(&'static str, usize)> = None;
        for &ingredient in self.ingredients {
            let overlap = longest_common_substring(&ingredient.to_lowercase(), &query);
            if best.is_none_or(|(_, longest)| overlap > longest) {
                best = Some((ingredient, overlap));
            }
        }
        best.map(|(ingredient, _)| ingredient)
    }
}

fn longest_common_substring(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous = vec![0; b.len() + 1];
    let mut longest = 0;

    for &ca in &a {
        let mut current = vec![0; b.len() + 1];
        for (j, &cb) in b.iter().enumerate() {
            if ca == cb {
                current[j + 1] = previous[j] + 1;
                longest = longest.max(current[j + 1]);
            }
        }
        previous = current;
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_ignores_case() {
        assert_eq!(find("pancakes").map(|r| r.name), Some("Pancakes"));
        assert_eq!(find(" TOMATO SOUP ").map(|r| r.name), Some("Tomato Soup"));
        assert!(find("beef wellington").is_none());
    }

    #[test]
    fn test_closest_ingredient() {
        let pancakes = find("pancakes").unwrap();
        assert_eq!(pancakes.closest_ingredient("eggs"), Some("2 large eggs"));
        assert_eq!(pancakes.closest_ingredient("milk do I need"), Some("300ml semi-skimmed milk"));
    }

    #[test]
    fn test_longest_common_substring() {
        assert_eq!(longest_common_substring("flour", "plain flour"), 5);
        assert_eq!(longest_common_substring("abc", "xyz"), 0);
    }
}
