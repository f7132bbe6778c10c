use brioche_recipe::{
    BakedRecipe, BuildEnv, BuildExecutor, BuildPlan, BuildRequest, ExecutionError, LoaderConfig,
    PlanRunner, Recipe, RecipeDeclaration, RecipeError, RecipeGraph, RecipeHash, RecipeId,
    SourceFetcher, load_recipes,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

fn declaration(name: &str, version: &str, deps: &[(&str, &str)]) -> RecipeDeclaration {
    let mut text = format!(
        "name: {name}\nversion: \"{version}\"\nsource:\n  tarball: https://example.org/{name}-{version}.tar.gz\nbuild:\n  script: make && make install\n"
    );
    if !deps.is_empty() {
        text.push_str("dependencies:\n");
        for (dep, dep_version) in deps {
            text.push_str(&format!("  {dep}: \"{dep_version}\"\n"));
        }
    }
    RecipeDeclaration::from_yaml_str(format!("{name}.yml"), &text).unwrap()
}

fn graph(declarations: &[RecipeDeclaration]) -> Result<RecipeGraph, RecipeError> {
    let recipes = load_recipes(declarations, &LoaderConfig::default())?.into_strict()?;
    RecipeGraph::build(recipes)
}

fn plan_names(plan: &BuildPlan) -> Vec<String> {
    plan.iter().map(|recipe| recipe.name().to_string()).collect()
}

/// A bootstrap-shaped set: cross toolchain first, then userland
fn toolchain() -> Vec<RecipeDeclaration> {
    vec![
        declaration("binutils", "2.37", &[]),
        declaration("linux-headers", "5.13.12", &[]),
        declaration("gcc", "11.2.0", &[("binutils", "2.37")]),
        declaration(
            "glibc",
            "2.34",
            &[
                ("binutils", "2.37"),
                ("gcc", "11.2.0"),
                ("linux-headers", "5.13.12"),
            ],
        ),
        declaration("libstdcxx", "11.2.0", &[("glibc", "2.34"), ("gcc", "11.2.0")]),
        declaration("m4", "1.4.19", &[("glibc", "2.34")]),
        declaration("ncurses", "6.2", &[("glibc", "2.34"), ("libstdcxx", "11.2.0")]),
        declaration("bash", "5.1.8", &[("ncurses", "6.2")]),
        declaration("coreutils", "8.32", &[("glibc", "2.34")]),
        declaration("file", "5.40", &[]),
        declaration("hello", "2.12", &[]),
    ]
}

#[test]
fn test_every_recipe_once_after_its_dependencies() {
    let graph = graph(&toolchain()).unwrap();
    let plan = BuildPlan::new(&graph).unwrap();

    assert_eq!(plan.len(), graph.len());
    for recipe in graph.recipes() {
        let position = plan.position(&recipe.id).unwrap();
        assert_eq!(plan.iter().filter(|step| step.id == recipe.id).count(), 1);
        for dependency in recipe.dependency_ids() {
            let dependency_position = plan.position(&dependency).unwrap();
            assert!(
                dependency_position < position,
                "{dependency} must come before {}",
                recipe.id
            );
        }
    }
}

#[test]
fn test_plan_ignores_declaration_order() {
    let expected = plan_names(&BuildPlan::new(&graph(&toolchain()).unwrap()).unwrap());

    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..20 {
        let mut declarations = toolchain();
        declarations.shuffle(&mut rng);

        let plan = BuildPlan::new(&graph(&declarations).unwrap()).unwrap();
        assert_eq!(plan_names(&plan), expected);
    }
}

#[test]
fn test_bootstrap_scenario() {
    let declarations = vec![
        declaration("binutils", "2.37", &[]),
        declaration("gcc", "11.2.0", &[("binutils", "2.37")]),
        declaration(
            "glibc",
            "2.34",
            &[
                ("binutils", "2.37"),
                ("gcc", "11.2.0"),
                ("linux-headers", "5.13.12"),
            ],
        ),
        declaration("linux-headers", "5.13.12", &[]),
    ];

    let plan = BuildPlan::new(&graph(&declarations).unwrap()).unwrap();
    assert_eq!(plan_names(&plan), vec!["binutils", "linux-headers", "gcc", "glibc"]);
}

#[test]
fn test_cycle_reports_both_recipes() {
    let declarations = vec![
        declaration("a", "1", &[("b", "1")]),
        declaration("b", "1", &[("a", "1")]),
    ];

    match graph(&declarations) {
        Err(RecipeError::CyclicDependency { cycle }) => {
            assert!(cycle.contains(&RecipeId::new("a", "1")));
            assert!(cycle.contains(&RecipeId::new("b", "1")));
            assert_eq!(cycle.first(), cycle.last());
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_cycle_deep_in_toolchain() {
    let mut declarations = toolchain();
    // glibc now also needs bash, which sits on top of glibc
    declarations[3] = declaration(
        "glibc",
        "2.34",
        &[
            ("binutils", "2.37"),
            ("gcc", "11.2.0"),
            ("linux-headers", "5.13.12"),
            ("bash", "5.1.8"),
        ],
    );

    match graph(&declarations) {
        Err(RecipeError::CyclicDependency { cycle }) => {
            for name in ["bash", "ncurses", "glibc"] {
                assert!(
                    cycle.iter().any(|id| id.name == name),
                    "{name} missing from {cycle:?}"
                );
            }
        }
        other => panic!("expected a cycle, got {other:?}"),
    }
}

#[test]
fn test_unresolved_dependency_names_missing_pair() {
    let declarations = vec![
        declaration("binutils", "2.37", &[]),
        declaration("gcc", "11.2.0", &[("binutils", "2.38")]),
    ];

    assert_eq!(
        graph(&declarations).unwrap_err(),
        RecipeError::UnresolvedDependency {
            recipe: RecipeId::new("gcc", "11.2.0"),
            dependency: RecipeId::new("binutils", "2.38"),
        }
    );
}

#[test]
fn test_duplicate_declarations() {
    let declarations = vec![declaration("x", "1.0", &[]), declaration("x", "1.0", &[])];
    let result = load_recipes(&declarations, &LoaderConfig::default());
    assert!(matches!(result, Err(RecipeError::DuplicateRecipe { .. })));
}

#[test]
fn test_target_plan_and_stages() {
    let graph = graph(&toolchain()).unwrap();
    let plan = BuildPlan::for_target(&graph, &RecipeId::new("bash", "5.1.8")).unwrap();

    assert_eq!(
        plan_names(&plan),
        vec![
            "binutils",
            "linux-headers",
            "gcc",
            "glibc",
            "libstdcxx",
            "ncurses",
            "bash"
        ]
    );

    let stages: Vec<Vec<&str>> = plan
        .stages()
        .into_iter()
        .map(|stage| stage.iter().map(Recipe::name).collect())
        .collect();
    assert_eq!(
        stages,
        vec![
            vec!["binutils", "linux-headers"],
            vec!["gcc"],
            vec!["glibc"],
            vec!["libstdcxx"],
            vec!["ncurses"],
            vec!["bash"],
        ]
    );
}

#[test]
fn test_hashes_follow_dependencies() {
    let before = {
        let graph = graph(&toolchain()).unwrap();
        RecipeHash::compute_all(&BuildPlan::new(&graph).unwrap()).unwrap()
    };

    let mut declarations = toolchain();
    declarations[1] = declaration("linux-headers", "5.13.13", &[]);
    declarations[3] = declaration(
        "glibc",
        "2.34",
        &[
            ("binutils", "2.37"),
            ("gcc", "11.2.0"),
            ("linux-headers", "5.13.13"),
        ],
    );
    let after = {
        let graph = graph(&declarations).unwrap();
        RecipeHash::compute_all(&BuildPlan::new(&graph).unwrap()).unwrap()
    };

    let bash = RecipeId::new("bash", "5.1.8");
    let gcc = RecipeId::new("gcc", "11.2.0");
    assert_ne!(before[&bash], after[&bash]);
    assert_eq!(before[&gcc], after[&gcc]);
}

/// Records calls and fails on request
#[derive(Default)]
struct Recorder {
    fetched: Mutex<Vec<RecipeId>>,
    built: Mutex<Vec<(RecipeId, BTreeMap<RecipeId, PathBuf>, BTreeMap<String, String>)>>,
    fail_build: Option<&'static str>,
}

impl SourceFetcher for Recorder {
    async fn fetch(&self, recipe: &Recipe) -> Result<PathBuf, ExecutionError> {
        self.fetched.lock().unwrap().push(recipe.id.clone());
        Ok(PathBuf::from("/src").join(recipe.name()))
    }
}

impl BuildExecutor for Recorder {
    async fn build(&self, request: BuildRequest<'_>) -> Result<PathBuf, ExecutionError> {
        let id = request.recipe.id.clone();
        self.built.lock().unwrap().push((
            id.clone(),
            request.dependency_prefixes.clone(),
            request.env.clone(),
        ));

        if self.fail_build == Some(id.name.as_str()) {
            return Err(ExecutionError::Build {
                recipe: id,
                message: "exit status 2".to_string(),
            });
        }
        Ok(PathBuf::from("/out").join(&id.name))
    }
}

fn env() -> BuildEnv {
    BuildEnv::new("/prefix", "x86_64-brioche_bootstrap-linux-gnu")
}

#[tokio::test]
async fn test_runner_passes_dependency_prefixes() {
    let graph = graph(&toolchain()).unwrap();
    let plan = BuildPlan::for_target(&graph, &RecipeId::new("glibc", "2.34")).unwrap();

    let recorder = Recorder::default();
    let baked = PlanRunner::new(&recorder, &recorder, env())
        .run(&plan)
        .await
        .unwrap();

    let baked_ids: Vec<&RecipeId> = baked.iter().map(|baked| &baked.id).collect();
    let plan_ids: Vec<&RecipeId> = plan.ids().collect();
    assert_eq!(baked_ids, plan_ids);
    assert_eq!(
        baked.last(),
        Some(&BakedRecipe {
            id: RecipeId::new("glibc", "2.34"),
            prefix_path: PathBuf::from("/out/glibc"),
        })
    );

    let built = recorder.built.lock().unwrap();
    let (_, prefixes, env) = built
        .iter()
        .find(|(id, _, _)| id.name == "glibc")
        .unwrap();
    let prefix_names: Vec<&str> = prefixes.keys().map(|id| id.name.as_str()).collect();
    assert_eq!(prefix_names, vec!["binutils", "gcc", "linux-headers"]);
    assert_eq!(prefixes[&RecipeId::new("gcc", "11.2.0")], PathBuf::from("/out/gcc"));
    assert_eq!(env["BRIOCHE_PREFIX"], "/prefix");
    assert_eq!(env["BRIOCHE_BOOTSTRAP_TARGET"], "x86_64-brioche_bootstrap-linux-gnu");

    assert_eq!(recorder.fetched.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_runner_stops_after_failing_stage() {
    let graph = graph(&toolchain()).unwrap();
    let plan = BuildPlan::new(&graph).unwrap();

    let recorder = Recorder {
        fail_build: Some("gcc"),
        ..Recorder::default()
    };
    let result = PlanRunner::new(&recorder, &recorder, env()).run(&plan).await;

    assert_eq!(
        result,
        Err(ExecutionError::Build {
            recipe: RecipeId::new("gcc", "11.2.0"),
            message: "exit status 2".to_string(),
        })
    );

    let built: Vec<String> = recorder
        .built
        .lock()
        .unwrap()
        .iter()
        .map(|(id, _, _)| id.name.clone())
        .collect();
    // Stage 0 and the failing stage 1 ran, nothing after
    assert!(built.contains(&"file".to_string()));
    assert!(built.contains(&"gcc".to_string()));
    assert!(!built.contains(&"glibc".to_string()));
}
