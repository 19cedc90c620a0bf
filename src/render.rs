//! Abstract render surface
//!
//! The pipeline emits fully-resolved render intents through this trait
//! and never assumes a visual representation. The binary ships a plain
//! console implementation; a web layer would paint the same calls onto
//! the DOM.

use crate::intent::{ActionData, Product};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Render: Send {
    /// Show a status notice (title + detail).
    fn status(&mut self, title: &str, detail: &str, severity: Severity);
    /// Echo the command being processed.
    fn command(&mut self, text: &str);
    /// Show the interpreted result of a command.
    fn result(&mut self, data: &ActionData);
    /// Show a candidate list for search results or disambiguation.
    fn candidates(&mut self, products: &[Product], data: &ActionData);
    /// Ask the user to confirm a pending movement.
    fn confirmation(&mut self, data: &ActionData);
    /// Return the surface to its empty state.
    fn clear(&mut self);
    /// Backend reachability indicator.
    fn connection(&mut self, ok: bool);
    /// Command-capture indicator.
    fn listening(&mut self, active: bool);
}

/// Status message catalog for the lifecycle states.
pub mod messages {
    pub const IDLE: (&str, &str) = (
        "Sistema en espera",
        "Di \"inventario activar\" para comenzar",
    );
    pub const AWAKE: (&str, &str) = ("Asistente activado", "¡Dime tu comando!");
    pub const LISTENING: (&str, &str) = (
        "Grabando audio...",
        "Habla ahora - el sistema está escuchando",
    );
    pub const PROCESSING: (&str, &str) = ("Procesando comando...", "Analizando tu solicitud");
}

/// Console renderer used by the binary.
pub struct ConsoleRender;

impl Render for ConsoleRender {
    fn status(&mut self, title: &str, detail: &str, severity: Severity) {
        let tag = match severity {
            Severity::Info => "info",
            Severity::Success => "ok",
            Severity::Warning => "warn",
            Severity::Error => "error",
        };
        println!("[{tag}] {title}: {detail}");
    }

    fn command(&mut self, text: &str) {
        println!("> \"{text}\"");
    }

    fn result(&mut self, data: &ActionData) {
        println!(
            "[{:?} {:.0}%] {}",
            data.intencion,
            data.confianza * 100.0,
            data.mensaje
        );
        if let Some(producto) = &data.producto {
            println!("  producto: {producto}");
        }
        if let Some(cantidad) = data.cantidad {
            println!("  cantidad: {cantidad} unidades");
        }
        if data.necesita_clarificacion && !data.campos_faltantes.is_empty() {
            println!("  falta: {}", data.campos_faltantes.join(", "));
        }
    }

    fn candidates(&mut self, products: &[Product], _data: &ActionData) {
        for p in products {
            let stock = p
                .stock_actual
                .map(|s| format!(" (stock {s})"))
                .unwrap_or_default();
            println!("  [{}] {}{stock}", p.id_articulo, p.nombre);
        }
    }

    fn confirmation(&mut self, data: &ActionData) {
        println!("{}", data.mensaje);
        println!("  confirmar con /confirmar, descartar con /cancelar");
    }

    fn clear(&mut self) {
        println!("---");
    }

    fn connection(&mut self, ok: bool) {
        println!("[conexión] {}", if ok { "conectado" } else { "error" });
    }

    fn listening(&mut self, active: bool) {
        println!("[micrófono] {}", if active { "activo" } else { "inactivo" });
    }
}
