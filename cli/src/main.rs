use anyhow::Context;
use clap::{Parser, Subcommand, ValueHint};
use owlet_owl::{DEFAULT_TIMEOUT, HttpFetcher, NamedNode, Ontology, OntologyLoader};
use owlet_ttl::TurtleParser;
use std::collections::HashSet;
use std::fs;
use std::io::{self, BufWriter, Write, stdin, stdout};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(about, version, name = "owlet")]
/// Owlet OWL ontology toolkit: parse Turtle documents, resolve owl:imports
/// closures and export the resolved model.
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a Turtle file and print its triples as N-Triples.
    ///
    /// Reads from standard input when no file is given.
    Triples {
        /// File to parse.
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// Base IRI relative IRI references are resolved against.
        #[arg(short, long, value_hint = ValueHint::Url)]
        base: Option<String>,
    },
    /// Load an ontology and print a summary of the resolved model.
    ///
    /// Reads from standard input when neither a file nor --iri is given.
    Inspect {
        /// File to load.
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// IRI to fetch the root ontology document from instead of a file.
        #[arg(short, long, value_hint = ValueHint::Url, conflicts_with = "file")]
        iri: Option<String>,
        /// Do not fetch and merge owl:imports targets.
        #[arg(long)]
        no_imports: bool,
        /// Fetch timeout in seconds.
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Load an ontology and emit the resolved model as JSON.
    ///
    /// Reads from standard input when neither a file nor --iri is given.
    Export {
        /// File to load.
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
        /// IRI to fetch the root ontology document from instead of a file.
        #[arg(short, long, value_hint = ValueHint::Url, conflicts_with = "file")]
        iri: Option<String>,
        /// Do not fetch and merge owl:imports targets.
        #[arg(long)]
        no_imports: bool,
        /// Fetch timeout in seconds.
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

pub fn main() -> anyhow::Result<()> {
    let matches = Args::parse();
    match matches.command {
        Command::Triples { file, base } => {
            let document = read_document(file.as_deref())?;
            let mut parser = TurtleParser::new();
            if let Some(base) = base {
                parser = parser.with_base_iri(base)?;
            }
            let mut out = BufWriter::new(stdout().lock());
            for triple in parser.parse_str(&document)? {
                writeln!(out, "{triple} .")?;
            }
            out.flush()?;
            Ok(())
        }
        Command::Inspect {
            file,
            iri,
            no_imports,
            timeout,
        } => {
            let ontology = load(file.as_deref(), iri.as_deref(), no_imports, timeout)?;
            let mut out = BufWriter::new(stdout().lock());
            write_summary(&mut out, &ontology)?;
            out.flush()?;
            Ok(())
        }
        Command::Export {
            file,
            iri,
            no_imports,
            timeout,
        } => {
            let ontology = load(file.as_deref(), iri.as_deref(), no_imports, timeout)?;
            let mut out = BufWriter::new(stdout().lock());
            serde_json::to_writer_pretty(&mut out, &ontology)?;
            out.write_all(b"\n")?;
            out.flush()?;
            Ok(())
        }
    }
}

fn load(
    file: Option<&Path>,
    iri: Option<&str>,
    no_imports: bool,
    timeout: Option<u64>,
) -> anyhow::Result<Ontology> {
    let timeout = timeout.map_or(DEFAULT_TIMEOUT, Duration::from_secs);
    let mut loader = OntologyLoader::new(HttpFetcher::new(timeout));
    if no_imports {
        loader = loader.without_imports();
    }
    Ok(if let Some(iri) = iri {
        loader.load_iri(iri)?
    } else {
        let document = read_document(file)?;
        loader.load_str(&document, None)?
    })
}

fn read_document(file: Option<&Path>) -> anyhow::Result<String> {
    Ok(if let Some(file) = file {
        fs::read_to_string(file)
            .with_context(|| format!("Not able to read file {}", file.display()))?
    } else {
        io::read_to_string(stdin().lock())?
    })
}

fn write_summary(out: &mut impl Write, ontology: &Ontology) -> io::Result<()> {
    writeln!(out, "{ontology}")?;
    if let Some(description) = ontology.descriptions.get(&ontology.iri) {
        writeln!(out, "{description}")?;
    }
    writeln!(out)?;
    writeln!(out, "Imports:")?;
    write_import_tree(out, ontology, &ontology.iri, 1, &mut HashSet::new())?;
    for class in ontology.classes.values() {
        writeln!(out)?;
        write!(out, "class {}", class.name)?;
        if let Some(parent) = &class.direct_parent {
            write!(out, ": {parent}")?;
        }
        if class.exact_child {
            write!(out, " (exact child)")?;
        }
        writeln!(out)?;
        for property in &class.properties {
            writeln!(
                out,
                "  {} {} ({})",
                property.name, property.representation, property.multiplicity
            )?;
        }
        for individual in &class.individuals {
            writeln!(out, "  individual {individual}")?;
        }
    }
    Ok(())
}

/// Prints the import graph as an indented tree. Already printed ontologies
/// are not expanded again, so mutual imports terminate.
fn write_import_tree(
    out: &mut impl Write,
    ontology: &Ontology,
    from: &NamedNode,
    depth: usize,
    seen: &mut HashSet<NamedNode>,
) -> io::Result<()> {
    writeln!(out, "{:indent$}{from}", "", indent = depth * 2)?;
    if !seen.insert(from.clone()) {
        return Ok(());
    }
    for target in ontology.imports.get(from).into_iter().flatten() {
        write_import_tree(out, ontology, target, depth + 1, seen)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::panic_in_result_fn)]

    use super::*;
    use anyhow::Result;
    use assert_cmd::Command;
    use assert_fs::NamedTempFile;
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    const ZOO: &str = r#"
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
@prefix zoo: <http://example.com/zoo#> .

<http://example.com/zoo> a owl:Ontology .
zoo:Animal a owl:Class .
zoo:name a owl:DatatypeProperty , owl:FunctionalProperty ;
    rdfs:domain zoo:Animal ;
    rdfs:range xsd:string .
"#;

    fn cli_command() -> Result<Command> {
        Ok(Command::cargo_bin("owlet")?)
    }

    #[test]
    fn cli_triples_from_stdin() -> Result<()> {
        cli_command()?
            .arg("triples")
            .write_stdin("@prefix ex: <http://example.com/> .\nex:s ex:p ex:o .")
            .assert()
            .success()
            .stdout("<http://example.com/s> <http://example.com/p> <http://example.com/o> .\n");
        Ok(())
    }

    #[test]
    fn cli_triples_resolves_against_base() -> Result<()> {
        let input_file = NamedTempFile::new("input.ttl")?;
        input_file.write_str("<s> <p> <o> .")?;
        cli_command()?
            .arg("triples")
            .arg(input_file.path())
            .arg("--base")
            .arg("http://example.com/")
            .assert()
            .success()
            .stdout("<http://example.com/s> <http://example.com/p> <http://example.com/o> .\n");
        Ok(())
    }

    #[test]
    fn cli_triples_reports_syntax_positions() -> Result<()> {
        cli_command()?
            .arg("triples")
            .write_stdin("<http://example.com/s> <http://example.com/p> .")
            .assert()
            .failure()
            .stderr(predicate::str::contains("line"));
        Ok(())
    }

    #[test]
    fn cli_inspect_summarizes_the_model() -> Result<()> {
        let input_file = NamedTempFile::new("zoo.ttl")?;
        input_file.write_str(ZOO)?;
        cli_command()?
            .arg("inspect")
            .arg(input_file.path())
            .arg("--no-imports")
            .assert()
            .success()
            .stdout(predicate::str::contains("class Animal"))
            .stdout(predicate::str::contains("name string (single)"));
        Ok(())
    }

    #[test]
    fn cli_export_emits_the_model_as_json() -> Result<()> {
        let input_file = NamedTempFile::new("zoo.ttl")?;
        input_file.write_str(ZOO)?;
        let assert = cli_command()?
            .arg("export")
            .arg(input_file.path())
            .assert()
            .success();
        let model: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout)?;
        assert_eq!(model["iri"], "http://example.com/zoo");
        assert!(model["classes"]["Animal"].is_object());
        assert_eq!(model["properties"]["name"]["multiplicity"], "Single");
        Ok(())
    }

    #[test]
    fn cli_inspect_fails_on_missing_files() -> Result<()> {
        cli_command()?
            .arg("inspect")
            .arg("this-file-does-not-exist.ttl")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Not able to read file"));
        Ok(())
    }
}
