//! Dependency graph over a loaded recipe set
//!
//! Building the graph validates the set: every declared dependency must be
//! loaded, and the "depends on" relation must be acyclic. Cycles are found
//! with a depth-first walk that keeps the recipes currently on the path, so
//! the full cycle can be reported rather than just one recipe in it.

use crate::error::{RecipeError, Result};
use crate::loader::RecipeSet;
use crate::recipe::{Recipe, RecipeId};
use brioche_graph::{DAG, GraphError, NodeId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Validated dependency graph.
///
/// Internally edges run from a dependency to its dependents, so a
/// topological sort of the DAG yields build order.
#[derive(Debug, Clone)]
pub struct RecipeGraph {
    recipes: RecipeSet,
    dag: DAG<RecipeId, ()>,
    nodes: BTreeMap<RecipeId, NodeId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

impl RecipeGraph {
    /// Link every recipe to its dependencies.
    ///
    /// # Errors
    ///
    /// - `RecipeError::UnresolvedDependency` for the first (in recipe order)
    ///   dependency that is not in the set
    /// - `RecipeError::CyclicDependency` with the closed cycle path if the
    ///   dependencies loop
    pub fn build(recipes: RecipeSet) -> Result<Self> {
        for recipe in &recipes {
            if let Some(dependency) = recipe.dependency_ids().find(|dep| !recipes.contains(dep)) {
                return Err(RecipeError::UnresolvedDependency {
                    recipe: recipe.id.clone(),
                    dependency,
                });
            }
        }

        if let Some(cycle) = find_cycle(&recipes) {
            return Err(RecipeError::CyclicDependency { cycle });
        }

        let mut dag = DAG::new();
        let mut nodes = BTreeMap::new();
        for id in recipes.ids() {
            let _ = nodes.insert(id.clone(), dag.add_node(id.clone()));
        }

        for recipe in &recipes {
            let dependent = nodes[&recipe.id];
            for dependency in recipe.dependency_ids() {
                dag.add_edge(nodes[&dependency], dependent, ())
                    .map_err(|e| map_graph_error(&dag, e))?;
            }
        }

        debug!(
            "Built recipe graph: {} recipes, {} dependency edges",
            dag.node_count(),
            dag.edge_count()
        );

        Ok(Self { recipes, dag, nodes })
    }

    /// Recipes in the graph
    pub fn recipes(&self) -> &RecipeSet {
        &self.recipes
    }

    /// Number of recipes
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    /// True when no recipe was loaded
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// Look up a recipe.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::UnknownRecipe` if it is not in the graph.
    pub fn get(&self, id: &RecipeId) -> Result<&Recipe> {
        self.recipes
            .get(id)
            .ok_or_else(|| RecipeError::UnknownRecipe(id.to_string()))
    }

    /// Recipes `id` directly depends on, ordered by identity.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::UnknownRecipe` if `id` is not in the graph.
    pub fn dependencies(&self, id: &RecipeId) -> Result<Vec<&Recipe>> {
        let node = self.node_id(id)?;
        self.recipes_at(self.dag.dependencies(node)?)
    }

    /// Recipes that directly depend on `id`, ordered by identity.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::UnknownRecipe` if `id` is not in the graph.
    pub fn dependents(&self, id: &RecipeId) -> Result<Vec<&Recipe>> {
        let node = self.node_id(id)?;
        self.recipes_at(self.dag.dependents(node)?)
    }

    /// Everything `id` needs, directly or not, ordered by identity.
    ///
    /// # Errors
    ///
    /// Returns `RecipeError::UnknownRecipe` if `id` is not in the graph.
    pub fn transitive_dependencies(&self, id: &RecipeId) -> Result<Vec<&Recipe>> {
        let node = self.node_id(id)?;
        self.recipes_at(self.dag.ancestors(node)?)
    }

    fn recipes_at(&self, nodes: impl IntoIterator<Item = NodeId>) -> Result<Vec<&Recipe>> {
        let mut recipes = nodes
            .into_iter()
            .map(|node| self.dag.node(node).map_err(RecipeError::from).and_then(|id| self.get(id)))
            .collect::<Result<Vec<_>>>()?;
        recipes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(recipes)
    }

    pub(crate) fn dag(&self) -> &DAG<RecipeId, ()> {
        &self.dag
    }

    pub(crate) fn node_id(&self, id: &RecipeId) -> Result<NodeId> {
        self.nodes
            .get(id)
            .copied()
            .ok_or_else(|| RecipeError::UnknownRecipe(id.to_string()))
    }
}

/// Translate a graph error into recipe terms.
///
/// A closed cycle from the DAG runs along precedence edges; it is reversed
/// so that each recipe depends on the next one.
pub(crate) fn map_graph_error(dag: &DAG<RecipeId, ()>, error: GraphError) -> RecipeError {
    match error {
        GraphError::CycleDetected(path) => {
            let mut cycle: Vec<RecipeId> = path
                .iter()
                .filter_map(|&node| dag.node(node).ok().cloned())
                .collect();
            if cycle.len() > 1 && cycle.first() == cycle.last() {
                cycle.reverse();
            }
            RecipeError::CyclicDependency { cycle }
        }
        other @ GraphError::NodeNotFound(_) => RecipeError::Graph(other),
    }
}

/// Depth-first search for a dependency cycle, visiting recipes in identity
/// order. Returns the first cycle found as a closed path.
fn find_cycle(recipes: &RecipeSet) -> Option<Vec<RecipeId>> {
    let mut state: BTreeMap<&RecipeId, Visit> = BTreeMap::new();
    let mut path: Vec<&RecipeId> = Vec::new();

    for id in recipes.ids() {
        if !state.contains_key(id) {
            if let Some(cycle) = visit(recipes, id, &mut state, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

fn visit<'a>(
    recipes: &'a RecipeSet,
    id: &'a RecipeId,
    state: &mut BTreeMap<&'a RecipeId, Visit>,
    path: &mut Vec<&'a RecipeId>,
) -> Option<Vec<RecipeId>> {
    let _ = state.insert(id, Visit::InProgress);
    path.push(id);

    // Dependencies were resolved before the walk, so every lookup hits
    let dependencies: BTreeSet<&RecipeId> = recipes
        .get(id)
        .map(|recipe| {
            recipe
                .dependency_ids()
                .filter_map(|dep| recipes.get(&dep).map(|loaded| &loaded.id))
                .collect()
        })
        .unwrap_or_default();

    for dependency in dependencies {
        match state.get(dependency) {
            Some(Visit::InProgress) => {
                let start = path.iter().position(|on_path| *on_path == dependency)?;
                let mut cycle: Vec<RecipeId> = path[start..].iter().map(|&id| id.clone()).collect();
                cycle.push(dependency.clone());
                return Some(cycle);
            }
            Some(Visit::Done) => {}
            None => {
                if let Some(cycle) = visit(recipes, dependency, state, path) {
                    return Some(cycle);
                }
            }
        }
    }

    let _ = path.pop();
    let _ = state.insert(id, Visit::Done);
    None
}
