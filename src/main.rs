use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use tokio::signal;
use tracing::{error, info};

use fleet_operations::config::environment::EnvironmentConfig;
use fleet_operations::database::connection::{create_pool, mask_database_url};
use fleet_operations::routes::create_app_router;
use fleet_operations::state::AppState;
use fleet_operations::storage::{FleetStore, MemoryStore, PostgresStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚚 Fleet Operations Backend");
    info!("===========================");

    let config = EnvironmentConfig::default();

    // Elegir backend de almacenamiento
    let store: Arc<dyn FleetStore> = match &config.database_url {
        Some(url) => {
            info!("🗄️  Conectando a PostgreSQL: {}", mask_database_url(url));
            let pool = match create_pool(url).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {}", e);
                    return Err(anyhow::anyhow!("Error de base de datos: {}", e));
                }
            };
            Arc::new(PostgresStore::new(pool))
        }
        None => {
            info!("🧠 DATABASE_URL ausente - usando store en memoria");
            Arc::new(MemoryStore::new())
        }
    };

    let app_state = AppState::new(store, config.clone());
    let app = create_app_router(app_state);

    let addr: SocketAddr = config.server_addr().parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🔑 Endpoints de autenticación:");
    info!("   POST /api/auth/login/operator - Login operador");
    info!("   POST /api/auth/login/owner - Login propietario");
    info!("   POST /api/auth/login/technician - Login técnico");
    info!("   POST /api/auth/logout - Revocar el token presentado");
    info!("🚗 Endpoints de trips (token de operador):");
    info!("   POST /api/trips - Crear trip");
    info!("   GET  /api/trips - Listar trips del operador");
    info!("   GET  /api/trips/:id - Obtener trip");
    info!("   POST /api/trips/:id/start - Iniciar trip");
    info!("   POST /api/trips/:id/end - Terminar trip (devuelve distance_km)");
    info!("   POST /api/trips/:id/cancel - Cancelar trip");
    info!("   POST /api/trips/:id/locations - Registrar waypoint");
    info!("   GET  /api/trips/:id/locations - Waypoints ordenados");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| {
            error!("❌ Error del servidor: {}", e);
            anyhow::anyhow!(e)
        })?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
