//! Backend intent classification payloads
//!
//! `ActionData` mirrors the JSON the classification service returns for
//! a processed command. Intents are a closed enum so that movement
//! handling is an exhaustive match instead of a string-prefix check.

use serde::{Deserialize, Serialize};

/// Intent tag assigned by the backend classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    BuscarProducto,
    RegistrarEntrada,
    RegistrarSalida,
    Error,
    // serde requires the catch-all variant to come last
    #[default]
    #[serde(other)]
    Desconocido,
}

impl Intent {
    /// Inventory movements are the only intents that require a
    /// confirmation/execution flow.
    pub fn is_movement(self) -> bool {
        matches!(self, Intent::RegistrarEntrada | Intent::RegistrarSalida)
    }

    /// Human label for a movement ("entrada" / "salida").
    pub fn movement_label(self) -> Option<&'static str> {
        match self {
            Intent::RegistrarEntrada => Some("entrada"),
            Intent::RegistrarSalida => Some("salida"),
            Intent::BuscarProducto | Intent::Desconocido | Intent::Error => None,
        }
    }
}

/// One candidate product returned by the backend matcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id_articulo: i64,
    pub nombre: String,
    #[serde(default)]
    pub codigo: Option<String>,
    #[serde(default)]
    pub stock_actual: Option<i64>,
    #[serde(default)]
    pub precio_venta: Option<f64>,
}

/// The backend's interpretation of one command.
///
/// Created per pending command, stashed while a confirmation or a
/// disambiguation is outstanding, and discarded once executed,
/// cancelled or superseded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    #[serde(default)]
    pub intencion: Intent,
    #[serde(default)]
    pub confianza: f64,
    #[serde(default)]
    pub mensaje: String,
    #[serde(default)]
    pub cantidad: Option<i64>,
    #[serde(default)]
    pub producto: Option<String>,
    #[serde(default)]
    pub productos_encontrados: Vec<Product>,
    #[serde(default)]
    pub necesita_clarificacion: bool,
    #[serde(default)]
    pub campos_faltantes: Vec<String>,
    #[serde(default)]
    pub puede_ejecutar: bool,
    #[serde(default)]
    pub listo_para_ejecutar: bool,
    #[serde(default)]
    pub producto_seleccionado: Option<Product>,
}

impl ActionData {
    /// Whether the pipeline may call execute without asking the user.
    pub fn auto_executable(&self) -> bool {
        self.listo_para_ejecutar && self.puede_ejecutar
    }

    /// Collapse a multi-candidate clarification onto one product.
    ///
    /// Marks the action ready to execute and rewrites the message as a
    /// confirmation question for the chosen candidate.
    pub fn select_product(&mut self, product: Product) {
        let tipo = self.intencion.movement_label().unwrap_or("movimiento");
        self.mensaje = format!(
            "¿Registrar {tipo} de {} unidades de '{}'?",
            self.cantidad.unwrap_or(0),
            product.nombre
        );
        self.productos_encontrados = vec![product.clone()];
        self.producto_seleccionado = Some(product);
        self.necesita_clarificacion = false;
        self.campos_faltantes.clear();
        self.puede_ejecutar = true;
        self.listo_para_ejecutar = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, nombre: &str) -> Product {
        Product {
            id_articulo: id,
            nombre: nombre.to_string(),
            codigo: None,
            stock_actual: Some(20),
            precio_venta: None,
        }
    }

    #[test]
    fn test_intent_tags_roundtrip() {
        let json = r#""REGISTRAR_ENTRADA""#;
        let intent: Intent = serde_json::from_str(json).unwrap();
        assert_eq!(intent, Intent::RegistrarEntrada);
        assert_eq!(serde_json::to_string(&intent).unwrap(), json);
    }

    #[test]
    fn test_unknown_tag_maps_to_desconocido() {
        let intent: Intent = serde_json::from_str(r#""LISTAR_ALMACENES""#).unwrap();
        assert_eq!(intent, Intent::Desconocido);
    }

    #[test]
    fn test_known_tags_win_over_catch_all() {
        for (json, expected) in [
            (r#""BUSCAR_PRODUCTO""#, Intent::BuscarProducto),
            (r#""REGISTRAR_SALIDA""#, Intent::RegistrarSalida),
            (r#""ERROR""#, Intent::Error),
        ] {
            let intent: Intent = serde_json::from_str(json).unwrap();
            assert_eq!(intent, expected);
        }
    }

    #[test]
    fn test_movement_predicate() {
        assert!(Intent::RegistrarEntrada.is_movement());
        assert!(Intent::RegistrarSalida.is_movement());
        assert!(!Intent::BuscarProducto.is_movement());
        assert!(!Intent::Desconocido.is_movement());
    }

    #[test]
    fn test_action_data_from_sparse_json() {
        let data: ActionData = serde_json::from_str(
            r#"{"intencion": "BUSCAR_PRODUCTO", "confianza": 0.9, "mensaje": "ok"}"#,
        )
        .unwrap();
        assert_eq!(data.intencion, Intent::BuscarProducto);
        assert!(data.productos_encontrados.is_empty());
        assert!(!data.auto_executable());
    }

    #[test]
    fn test_select_product_collapses_candidates() {
        let mut data = ActionData {
            intencion: Intent::RegistrarEntrada,
            cantidad: Some(5),
            necesita_clarificacion: true,
            campos_faltantes: vec!["producto_especifico".to_string()],
            productos_encontrados: vec![product(1, "lápiz HB"), product(2, "lápiz 2B")],
            ..ActionData::default()
        };

        data.select_product(product(2, "lápiz 2B"));

        assert_eq!(data.productos_encontrados.len(), 1);
        assert_eq!(data.productos_encontrados[0].id_articulo, 2);
        assert_eq!(
            data.producto_seleccionado.as_ref().map(|p| p.id_articulo),
            Some(2)
        );
        assert!(!data.necesita_clarificacion);
        assert!(data.campos_faltantes.is_empty());
        assert!(data.auto_executable());
        assert!(data.mensaje.contains("entrada"));
        assert!(data.mensaje.contains("lápiz 2B"));
    }
}
