//! Sample dataset installed when nothing could be loaded.

use crate::models::{new_node_id, Node};

fn sample(parent_id: Option<&str>, name: &str, description: &str, tags: &[&str]) -> Node {
    Node {
        id: new_node_id(),
        parent_id: parent_id.map(str::to_string),
        name: name.to_string(),
        description: description.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        collapsed: false,
    }
}

pub fn seed_nodes() -> Vec<Node> {
    let projects = sample(None, "Proyectos", "Carpeta principal", &["inicio"]);
    let documents = sample(None, "Documentos", "Mis documentos", &["docs"]);
    let project_a = sample(
        Some(&projects.id),
        "Proyecto A",
        "Descripcion A",
        &["proyecto", "urgent"],
    );
    vec![projects, documents, project_a]
}
