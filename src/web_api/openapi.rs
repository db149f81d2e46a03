//! OpenAPI document

use serde_json::{json, Value};

/// Static OpenAPI 3.0.3 description of the public routes
pub fn build_openapi() -> Value {
    json!({
        "openapi": "3.0.3",
        "info": {
            "title": "Himalia API",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "components": {
            "securitySchemes": {
                "ApiKeyAuth": {"type": "apiKey", "in": "header", "name": "X-API-Key"}
            }
        },
        "security": [{"ApiKeyAuth": []}],
        "paths": {
            "/api/v1/health": {
                "get": {
                    "summary": "Health check",
                    "security": [],
                    "responses": {
                        "200": {"description": "OK"},
                        "503": {"description": "Database unreachable"}
                    }
                }
            },
            "/api/v1/devices": {
                "get": {
                    "summary": "List devices",
                    "responses": {"200": {"description": "OK"}}
                },
                "post": {
                    "summary": "Create device",
                    "responses": {
                        "201": {"description": "Created"},
                        "400": {"description": "Validation error"}
                    }
                }
            },
            "/api/v1/devices/{id}": {
                "get": {
                    "summary": "Get device",
                    "responses": {
                        "200": {"description": "OK"},
                        "404": {"description": "Not found"}
                    }
                },
                "put": {
                    "summary": "Replace device",
                    "responses": {
                        "200": {"description": "OK"},
                        "400": {"description": "Validation error"},
                        "404": {"description": "Not found"}
                    }
                },
                "patch": {
                    "summary": "Update device",
                    "responses": {
                        "200": {"description": "OK"},
                        "400": {"description": "Validation error"},
                        "404": {"description": "Not found"}
                    }
                },
                "delete": {
                    "summary": "Delete device",
                    "responses": {
                        "204": {"description": "No content"},
                        "404": {"description": "Not found"}
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_device_routes() {
        let doc = build_openapi();
        assert_eq!(doc["openapi"], "3.0.3");
        let paths = doc["paths"].as_object().unwrap();
        assert!(paths.contains_key("/api/v1/devices"));
        assert!(paths.contains_key("/api/v1/devices/{id}"));
        assert!(paths["/api/v1/devices/{id}"].get("patch").is_some());
    }
}
