use actix_web::{get, HttpResponse};

use crate::types::QuickCategory;

/// One-click searches offered next to the search box
pub const QUICK_CATEGORIES: &[QuickCategory] = &[
    QuickCategory { key: "harry_potter", query: "Milovníci Harryho Pottera" },
    QuickCategory { key: "princess", query: "Pre malé princezné" },
    QuickCategory { key: "crosswords", query: "Krížovky pre starších" },
    QuickCategory { key: "puzzle", query: "Milovníci puzzle" },
    QuickCategory { key: "women_over40", query: "Pre ženy po štyridsiatke" },
    QuickCategory { key: "builders", query: "Pre malých staviteľov" },
];

#[get("/categories/quick")]
pub async fn quick_categories() -> actix_web::Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(QUICK_CATEGORIES))
}
