use super::tables::{get_table, ALL_TABLES};
use super::types::{ForeignKey, TableSchema};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Resolves foreign-key relationships between tables
pub struct DependencyResolver {
    /// Map of table name -> tables it depends on
    deps: HashMap<&'static str, HashSet<&'static str>>,
    /// Map of table name -> tables that depend on it
    reverse_deps: HashMap<&'static str, BTreeSet<&'static str>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        let mut deps: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
        let mut reverse_deps: HashMap<&'static str, BTreeSet<&'static str>> = HashMap::new();

        for table in ALL_TABLES {
            let table_deps = table.dependencies();
            deps.insert(table.name, table_deps.clone());

            for dep in table_deps {
                reverse_deps.entry(dep).or_default().insert(table.name);
            }
        }

        Self { deps, reverse_deps }
    }

    /// All tables, parents before children
    pub fn creation_order(&self) -> Result<Vec<&'static TableSchema>, String> {
        let all: HashSet<&str> = ALL_TABLES.iter().map(|t| t.name).collect();
        self.topological_sort(&all)
    }

    /// Every (child table, foreign key) pair that points at `table`.
    /// A table with two FKs to the same parent yields two entries.
    pub fn referencing(&self, table: &str) -> Vec<(&'static TableSchema, &'static ForeignKey)> {
        let Some(children) = self.reverse_deps.get(table) else {
            return Vec::new();
        };

        children
            .iter()
            .filter_map(|name| get_table(name))
            .flat_map(|child| {
                child
                    .foreign_keys
                    .iter()
                    .filter(move |fk| fk.references_table == table)
                    .map(move |fk| (child, fk))
            })
            .collect()
    }

    /// Topological sort of tables by dependencies
    fn topological_sort(
        &self,
        included: &HashSet<&str>,
    ) -> Result<Vec<&'static TableSchema>, String> {
        let mut result = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut temp_visited: HashSet<&str> = HashSet::new();

        // Walk in registry order so the output is stable between runs
        for table in ALL_TABLES {
            if included.contains(table.name) && !visited.contains(table.name) {
                self.visit(
                    table.name,
                    included,
                    &mut visited,
                    &mut temp_visited,
                    &mut result,
                )?;
            }
        }

        Ok(result)
    }

    fn visit<'a>(
        &self,
        name: &'a str,
        included: &HashSet<&'a str>,
        visited: &mut HashSet<&'a str>,
        temp_visited: &mut HashSet<&'a str>,
        result: &mut Vec<&'static TableSchema>,
    ) -> Result<(), String> {
        if temp_visited.contains(name) {
            return Err(format!("Circular dependency detected at: {}", name));
        }
        if visited.contains(name) {
            return Ok(());
        }

        temp_visited.insert(name);

        if let Some(deps) = self.deps.get(name) {
            for dep in deps {
                if *dep != name && included.contains(dep) {
                    self.visit(dep, included, visited, temp_visited, result)?;
                }
            }
        }

        temp_visited.remove(name);
        visited.insert(name);

        match get_table(name) {
            Some(table) => result.push(table),
            None => return Err(format!("Unknown table: {}", name)),
        }

        Ok(())
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}
