use paperclip::actix::web;

use crate::handlers;

pub fn config_app(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(handlers::health)))
        .service(
            web::scope("/api")
                .service(web::resource("/account").route(web::post().to(handlers::register)))
                .service(web::resource("/login").route(web::post().to(handlers::login)))
                .service(web::resource("/me").route(web::get().to(handlers::me)))
                .service(
                    web::scope("/shelf")
                        .service(web::resource("").route(web::post().to(handlers::save_book)))
                        .service(
                            web::resource("/{book_id}")
                                .route(web::delete().to(handlers::remove_book)),
                        ),
                )
                .service(
                    web::resource("/books/search")
                        .route(web::get().to(handlers::search_books)),
                ),
        );
}
