//! Static crop-protection advice per alert type.

use serde::Serialize;

use crate::db::enums::{AlertType, Priority};

struct Advice {
    title: &'static str,
    description: &'static str,
    priority: Priority,
}

const fn advice(title: &'static str, description: &'static str, priority: Priority) -> Advice {
    Advice {
        title,
        description,
        priority,
    }
}

const FROST: [Advice; 4] = [
    advice("Proteger cultivos", "Cubrir plantas sensibles con mantas térmicas o plástico durante la noche", Priority::High),
    advice("Riego preventivo", "Regar antes del atardecer para aprovechar el calor latente del agua", Priority::High),
    advice("Uso de combustión", "Quemar materiales para generar humo y calor en el cultivo", Priority::Medium),
    advice("Cosecha anticipada", "Cosechar productos maduros antes de la helada", Priority::High),
];

const HAIL: [Advice; 4] = [
    advice("Mallas antigranizo", "Instalar sistemas de protección con mallas sobre los cultivos", Priority::High),
    advice("Cañones antigranizo", "Activar sistemas de dispersión de nubes si están disponibles", Priority::Medium),
    advice("Refugio de animales", "Proteger al ganado en establos cubiertos", Priority::High),
    advice("Evaluación post-evento", "Inspeccionar daños y aplicar tratamientos preventivos contra plagas", Priority::Medium),
];

const RAIN: [Advice; 4] = [
    advice("Drenaje", "Verificar y limpiar sistemas de drenaje para evitar inundaciones", Priority::High),
    advice("Protección de semillas", "Evitar siembra durante lluvias intensas", Priority::Medium),
    advice("Control de erosión", "Implementar barreras vegetales o físicas en terrenos con pendiente", Priority::High),
    advice("Almacenamiento seguro", "Proteger cosechas almacenadas de la humedad", Priority::Medium),
];

const DROUGHT: [Advice; 4] = [
    advice("Riego eficiente", "Implementar sistemas de riego por goteo o aspersión", Priority::High),
    advice("Mulching", "Aplicar cobertura orgánica para retener humedad del suelo", Priority::Medium),
    advice("Cultivos resistentes", "Sembrar variedades adaptadas a condiciones de sequía", Priority::High),
    advice("Conservación de agua", "Almacenar agua de lluvia en reservorios", Priority::High),
];

const WIND: [Advice; 4] = [
    advice("Cortinas rompevientos", "Plantar árboles o instalar barreras para reducir velocidad del viento", Priority::Medium),
    advice("Reforzar estructuras", "Asegurar invernaderos y estructuras agrícolas", Priority::High),
    advice("Tutorado de plantas", "Atar y reforzar plantas altas susceptibles a volcarse", Priority::Medium),
    advice("Riego post-viento", "Reponer humedad perdida por evapotranspiración acelerada", Priority::Low),
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
}

/// Recommendations for `alert_type` (case-insensitive). Unknown types, and
/// types without advice, yield an empty list.
pub fn recommendations_for(alert_type: &str) -> Vec<Recommendation> {
    let Some(parsed) = AlertType::parse(alert_type) else {
        return Vec::new();
    };
    let table: &[Advice] = match parsed {
        AlertType::Frost => &FROST,
        AlertType::Hail => &HAIL,
        AlertType::Rain => &RAIN,
        AlertType::Drought => &DROUGHT,
        AlertType::Wind => &WIND,
        AlertType::Temperature => &[],
    };
    table
        .iter()
        .enumerate()
        .map(|(i, a)| Recommendation {
            id: format!("{}-{}", parsed.as_str(), i + 1),
            title: a.title.to_string(),
            description: a.description.to_string(),
            priority: a.priority,
        })
        .collect()
}
